use anyhow::Result;
use colored::Colorize;
use cost_console::{config, init_tracing, server};
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads the configuration, initializes logging from it and runs the
/// server until a shutdown signal arrives.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting cost console...".green());

    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    info!(config = %config_path.display(), "Configuration loaded");

    server::start_server(cfg).await
}
