mod loader;
mod types;

pub use loader::{load_from_path, validate_dos};
pub use types::{Config, DosConfig, IdPolicy, LoggingConfig, RejectMode};
