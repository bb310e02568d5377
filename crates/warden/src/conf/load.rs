//! Load — YAML config loading, watchlist merge, env interpolation.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::model::{ContainerConfig, WardenConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WatchlistFile {
    containers: Vec<ContainerConfig>,
}

impl WardenConfig {
    /// Load configuration from `<dir>/config.yml` and `<dir>/watchlist.yml`.
    ///
    /// Missing files are warnings, not errors — the daemon can run on
    /// defaults with an empty watchlist (the fatal init check is runtime
    /// reachability, performed by the caller). A file that exists but is
    /// malformed *is* an error.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join("config.yml");
        let mut config = if config_path.exists() {
            tracing::info!("loading configuration from {}", config_path.display());
            read_yaml::<WardenConfig>(&config_path)?
        } else {
            tracing::warn!(
                "config file not found at {}, using defaults",
                config_path.display()
            );
            WardenConfig::default()
        };

        config.llm.api_key = resolve_env(&config.llm.api_key);
        config.llm.base_url = resolve_env(&config.llm.base_url);

        let watchlist_path = dir.join("watchlist.yml");
        if watchlist_path.exists() {
            let watchlist = read_yaml::<WatchlistFile>(&watchlist_path)?;
            config.containers = watchlist
                .containers
                .into_iter()
                .filter(|c| c.enabled)
                .collect();
        } else {
            tracing::warn!(
                "watchlist not found at {}, no containers will be monitored",
                watchlist_path.display()
            );
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system.check_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "system.check_interval_seconds must be > 0".to_string(),
            ));
        }
        if self.system.resource_check_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "system.resource_check_interval_seconds must be > 0".to_string(),
            ));
        }
        if self.circuit_breaker.max_restart_attempts == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker.max_restart_attempts must be > 0".to_string(),
            ));
        }
        for container in &self.containers {
            if container.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "watchlist entry with empty name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// Resolve `${VAR_NAME}` placeholders against the process environment.
/// An unset variable resolves to empty, matching "credential not
/// configured" downstream behavior.
pub fn resolve_env(value: &str) -> String {
    if let Some(name) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        std::env::var(name).unwrap_or_default()
    } else {
        value.to_string()
    }
}
