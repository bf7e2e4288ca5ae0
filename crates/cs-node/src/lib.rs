//! # Composition Node
//!
//! Runtime wiring for the Composition service.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults → TOML file → environment)
//! 2. Initialize telemetry (logging + Prometheus registry)
//! 3. Open the configured repository and restore the graph
//! 4. Start the event logger and the HTTP gateway
//! 5. Wait for Ctrl+C, then shut down gracefully
//!
//! ## Modules
//!
//! - `config/` - `ServiceConfig` and its loading rules
//! - `adapters/` - Prometheus metrics sink/renderer, event logger
//! - `runtime` - `CompositionNode`, which owns every running component

pub mod adapters;
pub mod config;
pub mod runtime;

pub use config::{ConfigError, ServiceConfig, StorageBackend, StorageConfig};
pub use runtime::CompositionNode;
