//! Server configuration: a TOML file merged with `STREAMGOV_`-prefixed
//! environment overrides, deserialized into typed sections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use streamgov_service::GovConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Managed backing clusters, passed through to the services.
    #[serde(flatten)]
    pub governance: GovConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between drift-detection passes.
    pub interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Loads the configuration from an optional TOML file, then applies
/// `STREAMGOV_`-prefixed environment overrides (`__` as section separator).
pub fn load_config(path: Option<&str>) -> Result<ServerConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("STREAMGOV")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: ServerConfig = builder.build()?.try_deserialize()?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &ServerConfig) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for cluster in &cfg.governance.clusters {
        if cluster.name.is_empty() {
            return Err(ConfigError::Invalid("cluster name must not be empty".to_string()));
        }
        if !seen.insert(cluster.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate cluster name: {}",
                cluster.name
            )));
        }
    }
    if cfg.reconcile.interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "reconcile.interval_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}
