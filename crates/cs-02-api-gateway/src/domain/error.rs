//! API Gateway error types.
//!
//! Every failure leaves the gateway as `{"error": {"code", "message", "data"}}`
//! with the HTTP status picked by the engine error it came from.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cs_01_composition_engine::CompositionError;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::error;

use super::config::ConfigError;

/// Machine-readable error codes
pub mod codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const REFERENCED_BY_OTHERS: &str = "REFERENCED_BY_OTHERS";

    pub const CYCLE_DETECTED: &str = "CYCLE_DETECTED";
    pub const DANGLING_DEPENDENCY: &str = "DANGLING_DEPENDENCY";
    pub const IMMUTABLE_FIELD_CHANGED: &str = "IMMUTABLE_FIELD_CHANGED";
    pub const UNIT_MISMATCH: &str = "UNIT_MISMATCH";
    pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";

    pub const NEGATIVE_COST: &str = "NEGATIVE_COST";
    pub const INVALID_QUANTITY: &str = "INVALID_QUANTITY";
    pub const DUPLICATE_DEPENDENCY: &str = "DUPLICATE_DEPENDENCY";
    pub const DEPENDENCY_NOT_FOUND: &str = "DEPENDENCY_NOT_FOUND";
    pub const TOO_MANY_DEPENDENCIES: &str = "TOO_MANY_DEPENDENCIES";
    pub const COST_OVERFLOW: &str = "COST_OVERFLOW";
}

/// Error returned to HTTP clients
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status (not serialized)
    pub status: StatusCode,
    /// Error code
    pub code: &'static str,
    /// Error message
    pub message: String,
    /// Optional additional data
    pub data: Option<Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach additional data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Body could not be parsed or does not match the expected shape
    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    /// Body exceeded the configured limit
    pub fn payload_too_large(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            format!("Payload too large: {}", details.into()),
        )
    }

    /// No route matched the request
    pub fn route_not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            format!("Route not found: {path}"),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    fn bad_request(code: &'static str, message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "[cs-02] Request failed");
        }
        (self.status, Json(json!({ "error": self }))).into_response()
    }
}

impl From<CompositionError> for ApiError {
    fn from(err: CompositionError) -> Self {
        let message = err.to_string();
        match err {
            CompositionError::NotFound(id) => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message)
                    .with_data(json!({ "id": id }))
            }
            CompositionError::AlreadyExists(id) => {
                Self::new(StatusCode::CONFLICT, codes::ALREADY_EXISTS, message)
                    .with_data(json!({ "id": id }))
            }
            CompositionError::ReferencedByOthers { id, dependents } => {
                Self::new(StatusCode::CONFLICT, codes::REFERENCED_BY_OTHERS, message)
                    .with_data(json!({ "id": id, "dependents": dependents }))
            }
            CompositionError::CycleDetected { path } => {
                Self::bad_request(codes::CYCLE_DETECTED, message).with_data(json!({ "path": path }))
            }
            CompositionError::DanglingDependency { id, missing } => {
                Self::bad_request(codes::DANGLING_DEPENDENCY, message)
                    .with_data(json!({ "id": id, "missing": missing }))
            }
            CompositionError::ImmutableFieldChanged { field } => {
                Self::bad_request(codes::IMMUTABLE_FIELD_CHANGED, message)
                    .with_data(json!({ "field": field }))
            }
            CompositionError::UnitMismatch { left, right } => {
                Self::bad_request(codes::UNIT_MISMATCH, message)
                    .with_data(json!({ "left": left, "right": right }))
            }
            CompositionError::DivisionByZero { unit } => {
                Self::bad_request(codes::DIVISION_BY_ZERO, message).with_data(json!({ "unit": unit }))
            }
            CompositionError::NegativeCost(cost) => {
                Self::bad_request(codes::NEGATIVE_COST, message).with_data(json!({ "cost": cost }))
            }
            CompositionError::InvalidQuantity { field } => {
                Self::bad_request(codes::INVALID_QUANTITY, message)
                    .with_data(json!({ "field": field }))
            }
            CompositionError::DuplicateDependency(of) => {
                Self::bad_request(codes::DUPLICATE_DEPENDENCY, message).with_data(json!({ "of": of }))
            }
            CompositionError::DependencyNotFound { id, of } => {
                Self::bad_request(codes::DEPENDENCY_NOT_FOUND, message)
                    .with_data(json!({ "id": id, "of": of }))
            }
            CompositionError::TooManyDependencies { count, max } => {
                Self::bad_request(codes::TOO_MANY_DEPENDENCIES, message)
                    .with_data(json!({ "count": count, "max": max }))
            }
            CompositionError::CostOverflow { id } => {
                Self::bad_request(codes::COST_OVERFLOW, message).with_data(json!({ "id": id }))
            }
            CompositionError::InvariantViolation(_) | CompositionError::Persistence(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(rejection.body_text())
        } else {
            ApiError::invalid_request(rejection.body_text())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::invalid_request(e.to_string())
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (startup and shutdown, never sent to clients)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("gateway already running")]
    AlreadyRunning,

    #[error("internal error: {0}")]
    Internal(String),
}
