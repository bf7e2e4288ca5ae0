//! Request and response bodies.
//!
//! Every body wraps its content in a named field:
//! `{"composition": {...}}`, `{"status": "DELETED"}`.

use cs_01_composition_engine::{
    Committed, Composition, CompositionId, CompositionPatch, DependencyInput, NewComposition,
    OperationStatus,
};
use serde::{Deserialize, Serialize};

/// `POST /v1/composition`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub composition: NewComposition,
}

/// `PUT /v1/composition/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub composition: CompositionPatch,
}

/// `PUT /v1/composition/:id/dependencies`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub dependency: DependencyInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionResponse {
    pub composition: Composition,
}

/// Result of a create or update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedResponse {
    pub composition: Composition,
    pub status: OperationStatus,
    /// Other compositions revalued by this commit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recomputed: Vec<CompositionId>,
}

impl From<Committed> for CommittedResponse {
    fn from(committed: Committed) -> Self {
        Self {
            composition: committed.composition,
            status: committed.status,
            recomputed: committed.recomputed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: OperationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub compositions: Vec<Composition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculateResponse {
    pub recomputed: Vec<CompositionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
