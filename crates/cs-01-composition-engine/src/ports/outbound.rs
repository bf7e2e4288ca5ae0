//! Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the Composition service requires from its host.

use crate::domain::entities::{Composition, CompositionId};
use crate::domain::errors::RepositoryError;
use crate::domain::events::CompositionEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Atomic batch of node writes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub upserts: Vec<Composition>,
    pub deletes: Vec<CompositionId>,
}

impl ChangeSet {
    pub fn upsert(mut self, node: Composition) -> Self {
        self.upserts.push(node);
        self
    }

    pub fn delete(mut self, id: CompositionId) -> Self {
        self.deletes.push(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }
}

/// Persistence for committed nodes.
///
/// Called while the service holds its write lock, so implementations must not
/// block on anything but their own storage.
pub trait CompositionRepository: Send + Sync {
    /// Every stored node.
    fn load_all(&self) -> Result<Vec<Composition>, RepositoryError>;

    /// Apply the batch. Either every operation lands or none does.
    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError>;

    fn save(&self, nodes: &[Composition]) -> Result<(), RepositoryError> {
        self.commit(ChangeSet {
            upserts: nodes.to_vec(),
            deletes: Vec::new(),
        })
    }

    fn delete(&self, id: &CompositionId) -> Result<(), RepositoryError> {
        self.commit(ChangeSet::default().delete(id.clone()))
    }
}

/// Event sink for committed changes
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Returns the number of receivers reached.
    async fn publish(&self, event: CompositionEvent) -> usize;

    /// Total events published so far.
    fn events_published(&self) -> u64;
}

/// Source of commit timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// How a mutation ended, for metrics labels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Committed,
    /// Rejected by validation; graph untouched
    Rejected,
    /// Invariant violation or persistence failure; rolled back
    Failed,
}

impl MutationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOutcome::Committed => "committed",
            MutationOutcome::Rejected => "rejected",
            MutationOutcome::Failed => "failed",
        }
    }
}

/// Metrics reporting. Implemented by the host's telemetry layer.
pub trait MetricsSink: Send + Sync {
    fn record_mutation(&self, operation: &'static str, outcome: MutationOutcome);

    fn record_propagation(&self, nodes: usize, elapsed: Duration);

    fn set_composition_count(&self, count: usize);
}

/// Discards every metric
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_mutation(&self, _operation: &'static str, _outcome: MutationOutcome) {}

    fn record_propagation(&self, _nodes: usize, _elapsed: Duration) {}

    fn set_composition_count(&self, _count: usize) {}
}
