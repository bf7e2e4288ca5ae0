//! # CS-02: API Gateway
//!
//! HTTP/JSON interface for the Composition engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    API GATEWAY (cs-02)                   │
//! ├──────────────────────────────────────────────────────────┤
//! │   HTTP :3344                                             │
//! │      │                                                   │
//! │   Middleware: Trace → Timeout → BodyLimit → CORS         │
//! │      │                                                   │
//! │   REST handlers (/v1/composition, /health, /metrics)     │
//! │      │                                                   │
//! │   CompositionApi (cs-01 inbound port)                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Engine errors are mapped to `{"error": {"code", "message", "data"}}`
//! bodies by [`ApiError`].
//!
//! ## Usage
//!
//! ```ignore
//! use cs_02_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let mut gateway = ApiGatewayService::new(GatewayConfig::default(), api)?;
//! gateway.start().await?;
//! // ...
//! gateway.shutdown().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod ports;
pub mod rest;
pub mod service;

pub use domain::config::{
    ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig, TimeoutConfig,
};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use ports::outbound::MetricsRenderer;
pub use rest::AppState;
pub use service::{build_router, ApiGatewayService};
