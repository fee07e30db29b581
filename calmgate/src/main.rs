#![forbid(unsafe_code)]

use clap::Parser;
use calmgate_lib::config::{load_from_path, LoggingConfig};
use calmgate_lib::{proxy, telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rate-limiting HTTP gate")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "demos/basic.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            telemetry::init_tracing(&LoggingConfig::default());
            error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };
    telemetry::init_tracing(&cfg.logging);

    info!(listen = %cfg.listen, backend = %cfg.backend, "configuration loaded");
    let cfg = Arc::new(cfg);
    if let Err(err) = proxy::run(cfg).await {
        error!(%err, "gate exited with error");
        std::process::exit(1);
    }
}
