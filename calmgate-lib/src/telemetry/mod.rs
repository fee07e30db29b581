use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize tracing from the logging section. `RUST_LOG` wins when set.
pub fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(logging.show_target)
        .init();
}
