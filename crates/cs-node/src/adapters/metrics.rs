//! Prometheus-backed metrics ports.

use cs_01_composition_engine::{MetricsSink, MutationOutcome};
use cs_02_api_gateway::MetricsRenderer;
use cs_telemetry::{
    gather_metrics, COMPOSITIONS_TOTAL, MUTATIONS_TOTAL, PROPAGATION_DURATION, PROPAGATION_NODES,
};
use std::time::Duration;
use tracing::warn;

/// Engine metrics written to the global Prometheus registry
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetricsSink;

impl MetricsSink for PrometheusMetricsSink {
    fn record_mutation(&self, operation: &'static str, outcome: MutationOutcome) {
        MUTATIONS_TOTAL
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    fn record_propagation(&self, nodes: usize, elapsed: Duration) {
        PROPAGATION_NODES.observe(nodes as f64);
        PROPAGATION_DURATION.observe(elapsed.as_secs_f64());
    }

    fn set_composition_count(&self, count: usize) {
        COMPOSITIONS_TOTAL.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

/// Serves the global registry on `/metrics`
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRenderer;

impl MetricsRenderer for PrometheusRenderer {
    fn render(&self) -> String {
        gather_metrics().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode metrics");
            String::new()
        })
    }
}
