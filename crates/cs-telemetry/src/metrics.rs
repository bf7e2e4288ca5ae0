//! Prometheus metrics for the Composition service.
//!
//! All metrics follow the naming convention: `cs_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Gauge**: `cs_compositions_total`, nodes currently in the graph
//! - **Counter**: `cs_mutations_total{operation,outcome}`
//! - **Histogram**: propagation size and duration

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Compositions currently in the graph
    pub static ref COMPOSITIONS_TOTAL: IntGauge = IntGauge::new(
        "cs_compositions_total",
        "Number of compositions in the graph"
    ).expect("metric creation failed");

    /// Mutations by operation and outcome
    pub static ref MUTATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cs_mutations_total", "Mutations by operation and outcome"),
        &["operation", "outcome"]  // outcome: committed/rejected/failed
    ).expect("metric creation failed");

    /// Nodes recomputed per propagation
    pub static ref PROPAGATION_NODES: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cs_propagation_nodes",
            "Compositions recomputed by one propagation"
        ).buckets(exponential_buckets(1.0, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Propagation wall time
    pub static ref PROPAGATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cs_propagation_duration_seconds",
            "Time spent planning and applying one propagation"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register every collector with the global registry.
///
/// Safe to call more than once; collectors already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMPOSITIONS_TOTAL.clone()),
        Box::new(MUTATIONS_TOTAL.clone()),
        Box::new(PROPAGATION_NODES.clone()),
        Box::new(PROPAGATION_DURATION.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}
