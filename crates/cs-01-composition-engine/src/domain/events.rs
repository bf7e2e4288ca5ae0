//! Domain events emitted after a commit

use super::entities::{Composition, CompositionId};
use serde::{Deserialize, Serialize};

/// Published once the write lock has been released
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompositionEvent {
    Created { composition: Composition },
    /// A client changed the node directly
    UpdatedManually { composition: Composition },
    /// Ancestors whose valuation changed through propagation
    UpdatedAutomatically { compositions: Vec<Composition> },
    Deleted { id: CompositionId },
}

impl CompositionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CompositionEvent::Created { .. } => "created",
            CompositionEvent::UpdatedManually { .. } => "updated_manually",
            CompositionEvent::UpdatedAutomatically { .. } => "updated_automatically",
            CompositionEvent::Deleted { .. } => "deleted",
        }
    }
}
