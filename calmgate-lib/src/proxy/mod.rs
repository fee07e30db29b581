mod forwarding;
mod server;
mod synthetic_response;

pub use server::{run, run_with_listener};
