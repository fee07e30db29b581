#![forbid(unsafe_code)]

pub mod config;
pub mod dos;
pub mod error;
pub mod proxy;
pub mod telemetry;
