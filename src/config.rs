use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub analytics: AnalyticsConfig,
    pub archive: ArchiveConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Where classified rows are appended
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum AnalyticsConfig {
    Sqlite {
        path: PathBuf,
        table: String,
    },
    /// Streaming-insert REST endpoint; the bearer token is read from `token_env`
    Http {
        endpoint: String,
        token_env: Option<String>,
    },
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig::Sqlite {
            path: PathBuf::from("data/analytics.db"),
            table: "iot_data".to_string(),
        }
    }
}

/// Where one blob per event is written
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ArchiveConfig {
    Fs {
        root: PathBuf,
    },
    Http {
        base_url: String,
        bucket: String,
        token_env: Option<String>,
    },
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig::Fs {
            root: PathBuf::from("data/archive_store"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub listen_addr: Option<SocketAddr>,
}

impl Config {
    /// Load from `path`; a missing file yields the local defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml(&content)?
        } else {
            tracing::info!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT must be a port number, got '{}'", port)))?;
            self.server.bind_addr.set_port(port);
        }
        Ok(())
    }
}

/// Read a secret from the environment variable named in config, if any.
pub fn token_from_env(token_env: Option<&str>) -> Result<Option<String>, ConfigError> {
    match token_env {
        None => Ok(None),
        Some(name) => std::env::var(name)
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("environment variable {} is not set", name))),
    }
}
