use std::fs;
use std::path::Path;

use crate::config::{Config, DosConfig};
use crate::error::{GateError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| GateError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| GateError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.backend.trim().is_empty() {
        return Err(GateError::Config("backend address cannot be empty".into()));
    }
    validate_dos(&cfg.dos)
}

/// Checks the gate section. Also used when a `DosConfig` is built in code
/// rather than loaded from a file.
pub fn validate_dos(dos: &DosConfig) -> Result<()> {
    if dos.max_requests_per_second == 0 {
        return Err(GateError::Config("dos.max_requests_per_second must be > 0".into()));
    }
    if dos.sample_period_ms == 0 || dos.sample_period_ms > 1000 {
        return Err(GateError::Config(format!(
            "dos.sample_period_ms must be in 1..=1000, got {}",
            dos.sample_period_ms
        )));
    }
    if dos.alpha <= 0.0 || dos.alpha > 1.0 {
        return Err(GateError::Config(format!(
            "dos.alpha must be in (0, 1], got {}",
            dos.alpha
        )));
    }
    if dos.delay_ms == 0 {
        return Err(GateError::Config("dos.delay_ms must be > 0".into()));
    }
    if dos.max_delay_queue == 0 {
        return Err(GateError::Config("dos.max_delay_queue must be > 0".into()));
    }
    if http::StatusCode::from_u16(dos.reject_status).is_err() {
        return Err(GateError::Config(format!(
            "dos.reject_status {} is not a valid HTTP status",
            dos.reject_status
        )));
    }
    Ok(())
}
