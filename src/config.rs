use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::costs::{DEFAULT_COST_ALLOCATION_TAGS, DEFAULT_MAX_PAGES};

/// Cost responses may be cached by the browser for 12 hours
pub const DEFAULT_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60 * 12;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub api_keys: Vec<ApiKeyConfig>,
    pub aws: AwsConfig,
    #[serde(default)]
    pub cost_monitoring: CostMonitoringConfig,
    #[serde(default)]
    pub ssm: SsmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Operator credential accepted as a Bearer token
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default = "default_aws_timeout")]
    pub timeout_seconds: u64,
    /// Override for the Cost Explorer endpoint (e.g. a local mock)
    #[serde(default)]
    pub cost_explorer_endpoint: Option<String>,
    /// Override for the CloudWatch Logs endpoint
    #[serde(default)]
    pub logs_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CostMonitoringConfig {
    /// Cost allocation tag keys; the first one filters per-cluster costs
    #[serde(default = "default_cost_allocation_tags")]
    pub tags: Vec<String>,

    /// Maximum provider calls per paginated retrieval
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_seconds: u64,
}

impl Default for CostMonitoringConfig {
    fn default() -> Self {
        Self {
            tags: default_cost_allocation_tags(),
            max_pages: default_max_pages(),
            cache_max_age_seconds: default_cache_max_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SsmConfig {
    /// Log group receiving SSM Run Command output
    #[serde(default = "default_ssm_log_group")]
    pub log_group_name: String,
    /// Region of the log group; defaults to `aws.region`
    #[serde(default)]
    pub region: Option<String>,
}

impl Default for SsmConfig {
    fn default() -> Self {
        Self {
            log_group_name: default_ssm_log_group(),
            region: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_aws_timeout() -> u64 {
    30
}

fn default_cost_allocation_tags() -> Vec<String> {
    DEFAULT_COST_ALLOCATION_TAGS.iter().map(|t| t.to_string()).collect()
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_cache_max_age() -> u64 {
    DEFAULT_CACHE_MAX_AGE_SECONDS
}

fn default_ssm_log_group() -> String {
    "/aws/ssm/cost-console".to_string()
}

impl SsmConfig {
    pub fn region<'a>(&'a self, aws: &'a AwsConfig) -> &'a str {
        self.region.as_deref().unwrap_or(&aws.region)
    }
}

/// Load configuration from `path`, overlaid with `COST_CONSOLE__*` variables.
///
/// Empty AWS settings fall back to the standard `AWS_*` variables.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("COST_CONSOLE").separator("__"))
        .build()?;

    let mut cfg: Config = config.try_deserialize()?;
    apply_aws_env_fallback(&mut cfg.aws, |name| std::env::var(name).ok());
    validate_config(&cfg)?;

    Ok(cfg)
}

fn apply_aws_env_fallback(aws: &mut AwsConfig, env: impl Fn(&str) -> Option<String>) {
    if aws.region.is_empty() {
        aws.region = env("AWS_REGION")
            .or_else(|| env("AWS_DEFAULT_REGION"))
            .unwrap_or_default();
    }
    if aws.access_key_id.is_empty() {
        aws.access_key_id = env("AWS_ACCESS_KEY_ID").unwrap_or_default();
    }
    if aws.secret_access_key.is_empty() {
        aws.secret_access_key = env("AWS_SECRET_ACCESS_KEY").unwrap_or_default();
    }
    if aws.session_token.is_none() {
        aws.session_token = env("AWS_SESSION_TOKEN").filter(|t| !t.is_empty());
    }
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!(
            "Invalid log format '{}', expected 'text' or 'json'",
            cfg.server.log_format
        );
    }

    if !cfg.api_keys.iter().any(|k| k.enabled) {
        anyhow::bail!("At least one enabled API key must be configured");
    }

    for key in &cfg.api_keys {
        if key.name.is_empty() {
            anyhow::bail!("API key name cannot be empty");
        }
        if key.key.is_empty() {
            anyhow::bail!("API key '{}' has an empty key", key.name);
        }
    }

    if cfg.aws.region.is_empty() {
        anyhow::bail!("AWS region must be configured (aws.region or AWS_REGION)");
    }

    if cfg.aws.access_key_id.is_empty() || cfg.aws.secret_access_key.is_empty() {
        anyhow::bail!("AWS credentials must be configured (aws.* or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY)");
    }

    if cfg.cost_monitoring.tags.iter().all(|t| t.trim().is_empty()) {
        anyhow::bail!("cost_monitoring.tags cannot be empty");
    }

    if cfg.cost_monitoring.max_pages == 0 {
        anyhow::bail!("cost_monitoring.max_pages must be greater than zero");
    }

    if cfg.ssm.log_group_name.is_empty() {
        anyhow::bail!("ssm.log_group_name cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        },
        api_keys: vec![
            ApiKeyConfig {
                key: "op-key-001".to_string(),
                name: "admin".to_string(),
                enabled: true,
            },
            ApiKeyConfig {
                key: "op-key-002".to_string(),
                name: "retired".to_string(),
                enabled: false,
            },
        ],
        aws: AwsConfig {
            region: "eu-west-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            timeout_seconds: 30,
            cost_explorer_endpoint: None,
            logs_endpoint: None,
        },
        cost_monitoring: CostMonitoringConfig::default(),
        ssm: SsmConfig {
            log_group_name: "/aws/ssm/test".to_string(),
            region: None,
        },
    }
}
