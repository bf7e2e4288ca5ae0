//! Host-side implementations of engine and gateway ports.

pub mod event_log;
pub mod metrics;

pub use event_log::spawn_event_logger;
pub use metrics::{PrometheusMetricsSink, PrometheusRenderer};
