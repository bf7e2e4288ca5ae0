//! # Service Configuration
//!
//! Load order: defaults → TOML file → environment overrides.
//!
//! The TOML file is taken from `CS_CONFIG`, or `composition.toml` in the
//! working directory when present. Missing sections keep their defaults.
//!
//! ```toml
//! [gateway.http]
//! port = 3344
//!
//! [storage]
//! backend = "file"
//! data_dir = "./data"
//! ```

use cs_01_composition_engine::config::EngineConfigError;
use cs_01_composition_engine::EngineConfig;
use cs_02_api_gateway::GatewayConfig;
use cs_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File read when `CS_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "composition.toml";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub engine: EngineConfig,
    pub gateway: GatewayConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

/// Where committed compositions live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    /// JSON snapshot under `data_dir`
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the file backend
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("Invalid engine config: {0}")]
    Engine(#[from] EngineConfigError),

    #[error("Invalid gateway config: {0}")]
    Gateway(#[from] cs_02_api_gateway::ConfigError),
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var("CS_CONFIG") {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.telemetry = config.telemetry.with_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `CS_HTTP_HOST`, `CS_HTTP_PORT`, `CS_STORAGE_BACKEND` and
    /// `CS_DATA_DIR` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CS_HTTP_HOST") {
            self.gateway.http.host = host.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "CS_HTTP_HOST",
                reason: format!("{e}"),
            })?;
        }
        if let Some(port) = lookup("CS_HTTP_PORT") {
            self.gateway.http.port = port.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "CS_HTTP_PORT",
                reason: format!("{e}"),
            })?;
        }
        if let Some(backend) = lookup("CS_STORAGE_BACKEND") {
            self.storage.backend = backend
                .parse()
                .map_err(|reason| ConfigError::InvalidEnv {
                    var: "CS_STORAGE_BACKEND",
                    reason,
                })?;
        }
        if let Some(dir) = lookup("CS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.gateway.validate()?;
        Ok(())
    }
}
