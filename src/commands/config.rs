use anyhow::Result;
use colored::Colorize;
use cost_console::config::{self, Config};
use cost_console::logging::{sanitize_optional_secret, sanitize_secret};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the current configuration with secrets masked
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(config_path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
///
/// Validates the configuration file
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  API Keys: {} ({} enabled)", cfg.api_keys.len(), cfg.api_keys.iter().filter(|k| k.enabled).count());
    println!("  Cost Allocation Tags: {}", cfg.cost_monitoring.tags.len());
    println!("  SSM Log Group: {}", cfg.ssm.log_group_name);

    info!("Configuration validation successful");
    Ok(())
}

/// Mask operator keys and AWS credentials for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();

    for key in &mut sanitized.api_keys {
        key.key = sanitize_secret(&key.key);
    }

    sanitized.aws.access_key_id = sanitize_secret(&cfg.aws.access_key_id);
    sanitized.aws.secret_access_key = "***".to_string();
    sanitized.aws.session_token = sanitize_optional_secret(cfg.aws.session_token.as_deref());

    sanitized
}
