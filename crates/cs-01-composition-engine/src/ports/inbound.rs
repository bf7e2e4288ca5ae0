//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::{
    Committed, Composition, CompositionId, CompositionPatch, DependencyInput, NewComposition,
    OperationStatus,
};
use crate::domain::errors::CompositionResult;
use async_trait::async_trait;

/// Primary Composition API
///
/// Every mutation is atomic: it either commits fully (validated, propagated
/// and persisted) or leaves the graph exactly as it was.
#[async_trait]
pub trait CompositionApi: Send + Sync {
    /// Insert a new node. Status `CREATED`.
    async fn create(&self, request: NewComposition) -> CompositionResult<Committed>;

    /// Lookup by id.
    async fn get(&self, id: &CompositionId) -> CompositionResult<Composition>;

    /// All nodes, sorted by id.
    async fn list(&self) -> CompositionResult<Vec<Composition>>;

    /// Nodes that declare a dependency on `id`, sorted by id.
    async fn uses(&self, id: &CompositionId) -> CompositionResult<Vec<Composition>>;

    /// Merge `patch` over the node, then re-validate and re-propagate.
    /// Status `UPDATED`.
    async fn update(
        &self,
        id: &CompositionId,
        patch: CompositionPatch,
    ) -> CompositionResult<Committed>;

    /// Replace the edge with the same `of`, or append it.
    async fn upsert_dependency(
        &self,
        id: &CompositionId,
        dependency: DependencyInput,
    ) -> CompositionResult<Committed>;

    /// Drop the edge pointing at `of`.
    async fn remove_dependency(
        &self,
        id: &CompositionId,
        of: &CompositionId,
    ) -> CompositionResult<Committed>;

    /// Remove a node nobody depends on. Status `DELETED`.
    async fn delete(&self, id: &CompositionId) -> CompositionResult<OperationStatus>;

    /// Re-run propagation rooted at `id`; returns the ids whose values changed.
    async fn recalculate(&self, id: &CompositionId) -> CompositionResult<Vec<CompositionId>>;
}
