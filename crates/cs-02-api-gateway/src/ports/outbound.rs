//! Outbound ports for the API Gateway.

/// Source of the Prometheus text exposition served on `/metrics`
pub trait MetricsRenderer: Send + Sync {
    fn render(&self) -> String;
}
