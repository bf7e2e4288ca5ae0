//! Configuration for the Composition Engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum dependency edges a single composition may declare
    pub max_dependencies_per_composition: usize,
    /// Buffer size of the broadcast event channel
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_dependencies_per_composition: 1000,
            event_channel_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.max_dependencies_per_composition == 0 {
            return Err(EngineConfigError::InvalidLimit(
                "max_dependencies_per_composition cannot be 0".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(EngineConfigError::InvalidLimit(
                "event_channel_capacity cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Engine configuration errors
#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}
