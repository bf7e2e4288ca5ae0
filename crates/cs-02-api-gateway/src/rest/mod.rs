//! REST interface: routes, handlers and wire payloads.

pub mod handlers;
pub mod payloads;

use crate::ports::outbound::MetricsRenderer;
use axum::routing::{delete, get, post, put};
use axum::Router;
use cs_01_composition_engine::CompositionApi;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn CompositionApi>,
    /// `None` serves an empty `/metrics` body
    pub metrics: Option<Arc<dyn MetricsRenderer>>,
}

impl AppState {
    pub fn new(api: Arc<dyn CompositionApi>) -> Self {
        Self { api, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRenderer>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Every route, without middleware or state
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/v1/composition",
            get(handlers::list_compositions).post(handlers::create_composition),
        )
        .route(
            "/v1/composition/:id",
            get(handlers::get_composition)
                .put(handlers::update_composition)
                .delete(handlers::delete_composition),
        )
        .route("/v1/composition/:id/uses", get(handlers::composition_uses))
        .route(
            "/v1/composition/:id/dependencies",
            put(handlers::upsert_dependency),
        )
        .route(
            "/v1/composition/:id/dependencies/:of",
            delete(handlers::remove_dependency),
        )
        .route(
            "/v1/composition/:id/recalculate",
            post(handlers::recalculate_composition),
        )
        .fallback(handlers::route_not_found)
}
