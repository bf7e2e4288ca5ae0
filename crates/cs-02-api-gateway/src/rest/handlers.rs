//! Route handlers.
//!
//! Handlers only translate between HTTP and [`CompositionApi`]; every rule
//! lives in the engine.
//!
//! [`CompositionApi`]: cs_01_composition_engine::CompositionApi

use super::payloads::{
    CommittedResponse, CompositionResponse, CreateRequest, DependencyRequest, HealthResponse,
    ListResponse, RecalculateResponse, StatusResponse, UpdateRequest,
};
use super::AppState;
use crate::domain::error::{ApiError, ApiResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, Uri};
use axum::response::IntoResponse;
use axum::Json;
use cs_01_composition_engine::CompositionId;
use tracing::debug;

/// Prometheus text exposition format
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|renderer| renderer.render())
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body)
}

pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::route_not_found(uri.path())
}

pub async fn list_compositions(State(state): State<AppState>) -> ApiResult<Json<ListResponse>> {
    let compositions = state.api.list().await?;
    Ok(Json(ListResponse { compositions }))
}

pub async fn create_composition(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<CommittedResponse>> {
    let Json(request) = payload?;
    let committed = state.api.create(request.composition).await?;
    debug!(id = %committed.composition.id, "[cs-02] Composition created");
    Ok(Json(committed.into()))
}

pub async fn get_composition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompositionResponse>> {
    let composition = state.api.get(&CompositionId::new(id)).await?;
    Ok(Json(CompositionResponse { composition }))
}

pub async fn update_composition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<CommittedResponse>> {
    let Json(request) = payload?;
    let committed = state
        .api
        .update(&CompositionId::new(id), request.composition)
        .await?;
    Ok(Json(committed.into()))
}

pub async fn delete_composition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.api.delete(&CompositionId::new(id)).await?;
    Ok(Json(StatusResponse { status }))
}

pub async fn composition_uses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ListResponse>> {
    let compositions = state.api.uses(&CompositionId::new(id)).await?;
    Ok(Json(ListResponse { compositions }))
}

pub async fn upsert_dependency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<DependencyRequest>, JsonRejection>,
) -> ApiResult<Json<CommittedResponse>> {
    let Json(request) = payload?;
    let committed = state
        .api
        .upsert_dependency(&CompositionId::new(id), request.dependency)
        .await?;
    Ok(Json(committed.into()))
}

pub async fn remove_dependency(
    State(state): State<AppState>,
    Path((id, of)): Path<(String, String)>,
) -> ApiResult<Json<CommittedResponse>> {
    let committed = state
        .api
        .remove_dependency(&CompositionId::new(id), &CompositionId::new(of))
        .await?;
    Ok(Json(committed.into()))
}

pub async fn recalculate_composition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecalculateResponse>> {
    let recomputed = state.api.recalculate(&CompositionId::new(id)).await?;
    Ok(Json(RecalculateResponse { recomputed }))
}
