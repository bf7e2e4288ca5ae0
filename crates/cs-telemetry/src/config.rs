//! Telemetry configuration.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to startup and shutdown logs
    pub service_name: String,

    /// `EnvFilter` directives (`info`, `cs_01_composition_engine=debug`, ...)
    pub log_level: String,

    /// Emit JSON log lines instead of pretty output
    pub json_logs: bool,

    /// Write logs to stdout
    pub console_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "composition-service".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
        }
    }
}

impl TelemetryConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of `self`.
    ///
    /// - `CS_LOG_LEVEL` or `RUST_LOG`: filter directives
    /// - `CS_JSON_LOGS`: `true`/`1` enables JSON output
    /// - `CS_CONSOLE_OUTPUT`: `false`/`0` disables stdout logging
    pub fn with_env(mut self) -> Self {
        if let Ok(level) = env::var("CS_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }
        if let Ok(v) = env::var("CS_JSON_LOGS") {
            self.json_logs = parse_flag(&v);
        }
        if let Ok(v) = env::var("CS_CONSOLE_OUTPUT") {
            self.console_output = parse_flag(&v);
        }
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
