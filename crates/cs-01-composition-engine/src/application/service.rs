//! Composition Service
//!
//! Main service implementing `CompositionApi`. Every mutation runs as one
//! unit under the graph write lock:
//! 1. Schema check
//! 2. Validate the affected subgraph against a candidate overlay
//! 3. Mutate the store (undo log records prior values)
//! 4. Plan and apply propagation over the node and its ancestors
//! 5. Persist the touched nodes
//!
//! Any failure after step 3 rolls the store back before the lock is released.
//! Events are published only once the lock is gone.

use crate::adapters::{InMemoryRepository, NoopEventPublisher, SystemClock};
use crate::algorithms::{collect_ancestors, plan_propagation, validate_subgraph, GraphView};
use crate::config::EngineConfig;
use crate::domain::entities::{
    Committed, Composition, CompositionId, CompositionPatch, Dependency, DependencyInput,
    NewComposition, OperationStatus,
};
use crate::domain::errors::{CompositionError, CompositionResult, PropagationError};
use crate::domain::events::CompositionEvent;
use crate::domain::graph::CompositionGraph;
use crate::domain::quantity::Quantity;
use crate::ports::inbound::CompositionApi;
use crate::ports::outbound::{
    ChangeSet, Clock, CompositionRepository, EventPublisher, MetricsSink, MutationOutcome,
    NoopMetricsSink,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Prior values of every node touched by an in-flight mutation
#[derive(Default)]
struct UndoLog {
    before: Vec<(CompositionId, Option<Composition>)>,
    seen: HashSet<CompositionId>,
}

impl UndoLog {
    /// Remember `id` as it is now. Only the first call per id counts.
    fn record(&mut self, graph: &CompositionGraph, id: &CompositionId) {
        if self.seen.insert(id.clone()) {
            self.before.push((id.clone(), graph.get(id).cloned()));
        }
    }

    fn rollback(self, graph: &mut CompositionGraph) {
        for (id, prior) in self.before.into_iter().rev() {
            match prior {
                Some(node) => {
                    graph.insert_node(node);
                }
                None => {
                    graph.evict(&id);
                }
            }
        }
    }

    /// Current state of every touched node, as a repository batch
    fn change_set(&self, graph: &CompositionGraph) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (id, _) in &self.before {
            match graph.get(id) {
                Some(node) => changes.upserts.push(node.clone()),
                None => changes.deletes.push(id.clone()),
            }
        }
        changes
    }
}

/// What a committed mutation hands back once the lock is released
struct Outcome<T> {
    value: T,
    events: Vec<CompositionEvent>,
    count: usize,
}

/// Composition Service
///
/// Owns the committed graph. Reads take the shared lock; mutations take the
/// exclusive lock for validation, mutation, propagation and persistence.
pub struct CompositionService {
    config: EngineConfig,
    graph: RwLock<CompositionGraph>,
    repository: Arc<dyn CompositionRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
}

impl CompositionService {
    /// Create a service over an empty graph
    pub fn new(
        config: EngineConfig,
        repository: Arc<dyn CompositionRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_graph(config, CompositionGraph::new(), repository, publisher, clock)
    }

    /// In-memory service with default config, no events and the system clock
    pub fn in_memory() -> Self {
        Self::new(
            EngineConfig::default(),
            Arc::new(InMemoryRepository::new()),
            Arc::new(NoopEventPublisher::default()),
            Arc::new(SystemClock),
        )
    }

    /// Rebuild the graph from the repository.
    ///
    /// Every node is re-validated; nodes whose subgraph no longer passes are
    /// kept with `validated = false`.
    pub fn restore(
        config: EngineConfig,
        repository: Arc<dyn CompositionRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> CompositionResult<Self> {
        let nodes = repository.load_all()?;
        let mut graph = CompositionGraph::from_nodes(nodes);

        let mut invalid = 0usize;
        for id in graph.ids() {
            let valid = validate_subgraph(&GraphView::committed(&graph), &id).is_ok();
            if let Some(node) = graph.get_node_mut(&id) {
                node.validated = valid;
            }
            if !valid {
                invalid += 1;
            }
        }

        if invalid > 0 {
            warn!(invalid, "Restored graph contains compositions that fail validation");
        }
        info!(compositions = graph.len(), "Composition graph restored");

        Ok(Self::with_graph(config, graph, repository, publisher, clock))
    }

    /// Report through `metrics` instead of discarding
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        metrics.set_composition_count(self.graph.read().len());
        self.metrics = metrics;
        self
    }

    fn with_graph(
        config: EngineConfig,
        graph: CompositionGraph,
        repository: Arc<dyn CompositionRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            graph: RwLock::new(graph),
            repository,
            publisher,
            clock,
            metrics: Arc::new(NoopMetricsSink),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of committed compositions
    pub fn len(&self) -> usize {
        self.graph.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.read().is_empty()
    }

    /// Every committed node, sorted by id
    pub fn snapshot(&self) -> Vec<Composition> {
        self.graph.read().snapshot()
    }

    // ---------------------------------------------------------------------
    // Schema checks
    // ---------------------------------------------------------------------

    fn check_cost(cost: f64) -> CompositionResult<()> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(CompositionError::NegativeCost(cost));
        }
        Ok(())
    }

    fn check_unit(unit: &Quantity) -> CompositionResult<()> {
        if !unit.is_valid() || unit.amount == 0.0 {
            return Err(CompositionError::InvalidQuantity {
                field: "unit".into(),
            });
        }
        Ok(())
    }

    fn check_stock(stock: &Quantity, unit: &Quantity) -> CompositionResult<()> {
        if !stock.is_valid() {
            return Err(CompositionError::InvalidQuantity {
                field: "stock".into(),
            });
        }
        stock.ensure_compatible(unit)?;
        Ok(())
    }

    fn check_dependencies(&self, dependencies: &[Dependency]) -> CompositionResult<()> {
        let max = self.config.max_dependencies_per_composition;
        if dependencies.len() > max {
            return Err(CompositionError::TooManyDependencies {
                count: dependencies.len(),
                max,
            });
        }

        let mut seen = HashSet::with_capacity(dependencies.len());
        for (i, dep) in dependencies.iter().enumerate() {
            if !dep.quantity.is_valid() {
                return Err(CompositionError::InvalidQuantity {
                    field: format!("dependencies[{i}].quantity"),
                });
            }
            if !seen.insert(&dep.of) {
                return Err(CompositionError::DuplicateDependency(dep.of.clone()));
            }
        }
        Ok(())
    }

    fn check_schema(&self, node: &Composition) -> CompositionResult<()> {
        Self::check_cost(node.cost)?;
        Self::check_unit(&node.unit)?;
        Self::check_stock(&node.stock, &node.unit)?;
        self.check_dependencies(&node.dependencies)
    }

    // ---------------------------------------------------------------------
    // Locked sections. Callers hold the write guard; nothing here awaits.
    // ---------------------------------------------------------------------

    /// Propagate from `root`, stamp changed nodes, persist everything touched.
    ///
    /// Returns the ids whose cost or subvalues changed, `root` included.
    fn propagate_and_persist(
        &self,
        graph: &mut CompositionGraph,
        mut undo: UndoLog,
        root: &CompositionId,
        now: DateTime<Utc>,
    ) -> CompositionResult<Vec<CompositionId>> {
        let started = Instant::now();
        let plan = match plan_propagation(graph, root) {
            Ok(plan) => plan,
            Err(e) => {
                match e {
                    PropagationError::CostOverflow { .. } => {
                        warn!(root = %root, error = %e, "Propagation rejected, rolling back")
                    }
                    PropagationError::InvariantViolation(_) => {
                        error!(root = %root, error = %e, "Propagation aborted, rolling back")
                    }
                }
                undo.rollback(graph);
                return Err(e.into());
            }
        };

        let nodes = plan.len();
        for id in plan.order() {
            undo.record(graph, id);
        }
        let changed = plan.apply(graph);
        self.metrics.record_propagation(nodes, started.elapsed());
        debug!(root = %root, nodes, changed = changed.len(), "Propagation applied");

        for id in &changed {
            if let Some(node) = graph.get_node_mut(id) {
                node.updated_at = now;
            }
        }

        if let Err(e) = self.repository.commit(undo.change_set(graph)) {
            error!(root = %root, error = %e, "Persistence failed, rolling back");
            undo.rollback(graph);
            return Err(e.into());
        }

        Ok(changed)
    }

    /// Mark `root` and every ancestor as waiting for propagation.
    ///
    /// Returns the ancestors, `root` excluded.
    fn mark_stale(
        graph: &mut CompositionGraph,
        undo: &mut UndoLog,
        root: &CompositionId,
    ) -> Vec<CompositionId> {
        let mut ancestors = Vec::new();
        for id in collect_ancestors(graph, root) {
            undo.record(graph, &id);
            if let Some(node) = graph.get_node_mut(&id) {
                node.uses_updated_since_last_change = false;
            }
            if &id != root {
                ancestors.push(id);
            }
        }
        ancestors
    }

    /// Re-check ancestors left unvalidated by `restore`; an edit below them
    /// may have repaired their subgraph.
    fn revalidate_flagged(
        graph: &mut CompositionGraph,
        undo: &mut UndoLog,
        ancestors: &[CompositionId],
    ) {
        for id in ancestors {
            if graph.get(id).map_or(true, |node| node.validated) {
                continue;
            }
            if validate_subgraph(&GraphView::committed(graph), id).is_ok() {
                undo.record(graph, id);
                if let Some(node) = graph.get_node_mut(id) {
                    node.validated = true;
                }
                debug!(id = %id, "Composition revalidated");
            }
        }
    }

    fn create_locked(
        &self,
        graph: &mut CompositionGraph,
        request: NewComposition,
        now: DateTime<Utc>,
    ) -> CompositionResult<Outcome<Committed>> {
        let id = request.id.unwrap_or_else(CompositionId::generate);
        if graph.contains(&id) {
            return Err(CompositionError::AlreadyExists(id));
        }

        let stock = request
            .stock
            .unwrap_or_else(|| Quantity::zero(request.unit.unit.clone()));
        let mut candidate = Composition {
            id: id.clone(),
            name: request.name.unwrap_or_default(),
            cost: request.cost.unwrap_or(0.0),
            unit: request.unit,
            stock,
            dependencies: request
                .dependencies
                .into_iter()
                .map(Dependency::from)
                .collect(),
            autoupdate_cost: request.autoupdate_cost.unwrap_or(true),
            enabled: request.enabled.unwrap_or(true),
            validated: false,
            uses_updated_since_last_change: false,
            created_at: now,
            updated_at: now,
        };

        self.check_schema(&candidate)?;
        validate_subgraph(&GraphView::with_candidate(graph, &candidate), &id)?;
        candidate.validated = true;

        let mut undo = UndoLog::default();
        undo.record(graph, &id);
        graph.insert_node(candidate);

        // Stored nodes may already point at this id
        let ancestors: Vec<CompositionId> = collect_ancestors(graph, &id)
            .into_iter()
            .filter(|a| a != &id)
            .collect();
        Self::revalidate_flagged(graph, &mut undo, &ancestors);

        self.propagate_and_persist(graph, undo, &id, now)?;

        let composition = graph.get_node(&id)?.clone();
        Ok(Outcome {
            events: vec![CompositionEvent::Created {
                composition: composition.clone(),
            }],
            value: Committed {
                status: OperationStatus::Created,
                composition,
                recomputed: Vec::new(),
            },
            count: graph.len(),
        })
    }

    /// Shared path for every edit of an existing node
    fn revise_locked(
        &self,
        graph: &mut CompositionGraph,
        id: &CompositionId,
        patch: CompositionPatch,
        now: DateTime<Utc>,
    ) -> CompositionResult<Outcome<Committed>> {
        let existing = graph.get_node(id)?;

        if let Some(unit) = &patch.unit {
            if unit != &existing.unit {
                return Err(CompositionError::ImmutableFieldChanged {
                    field: "unit".into(),
                });
            }
        }

        let mut revised = existing.clone();
        if let Some(name) = patch.name {
            revised.name = name;
        }
        if let Some(cost) = patch.cost {
            revised.cost = cost;
        }
        if let Some(stock) = patch.stock {
            revised.stock = stock;
        }
        let edges_changed = patch.dependencies.is_some();
        if let Some(dependencies) = patch.dependencies {
            revised.dependencies = dependencies.into_iter().map(Dependency::from).collect();
        }
        if let Some(autoupdate) = patch.autoupdate_cost {
            revised.autoupdate_cost = autoupdate;
        }
        if let Some(enabled) = patch.enabled {
            revised.enabled = enabled;
        }

        self.check_schema(&revised)?;
        validate_subgraph(&GraphView::with_candidate(graph, &revised), id)?;
        revised.validated = true;
        revised.uses_updated_since_last_change = false;
        revised.updated_at = now;

        let mut undo = UndoLog::default();
        let ancestors = Self::mark_stale(graph, &mut undo, id);

        let edges = std::mem::take(&mut revised.dependencies);
        if let Some(node) = graph.get_node_mut(id) {
            let current = std::mem::take(&mut node.dependencies);
            *node = Composition {
                dependencies: current,
                ..revised
            };
        }
        if edges_changed {
            if let Err(e) = graph.set_edges(id, edges) {
                undo.rollback(graph);
                return Err(e.into());
            }
            Self::revalidate_flagged(graph, &mut undo, &ancestors);
        }

        let changed = self.propagate_and_persist(graph, undo, id, now)?;
        let recomputed: Vec<CompositionId> = changed.into_iter().filter(|c| c != id).collect();

        let composition = graph.get_node(id)?.clone();
        let mut events = vec![CompositionEvent::UpdatedManually {
            composition: composition.clone(),
        }];
        if !recomputed.is_empty() {
            events.push(CompositionEvent::UpdatedAutomatically {
                compositions: recomputed
                    .iter()
                    .filter_map(|c| graph.get(c).cloned())
                    .collect(),
            });
        }

        Ok(Outcome {
            events,
            value: Committed {
                status: OperationStatus::Updated,
                composition,
                recomputed,
            },
            count: graph.len(),
        })
    }

    fn delete_locked(
        &self,
        graph: &mut CompositionGraph,
        id: &CompositionId,
    ) -> CompositionResult<Outcome<OperationStatus>> {
        graph.get_node(id)?;

        let mut undo = UndoLog::default();
        undo.record(graph, id);
        graph.remove_node(id)?;

        if let Err(e) = self.repository.commit(undo.change_set(graph)) {
            error!(id = %id, error = %e, "Persistence failed, rolling back");
            undo.rollback(graph);
            return Err(e.into());
        }

        Ok(Outcome {
            value: OperationStatus::Deleted,
            events: vec![CompositionEvent::Deleted { id: id.clone() }],
            count: graph.len(),
        })
    }

    fn recalculate_locked(
        &self,
        graph: &mut CompositionGraph,
        id: &CompositionId,
        now: DateTime<Utc>,
    ) -> CompositionResult<Outcome<Vec<CompositionId>>> {
        graph.get_node(id)?;

        let changed = self.propagate_and_persist(graph, UndoLog::default(), id, now)?;
        let mut events = Vec::new();
        if !changed.is_empty() {
            events.push(CompositionEvent::UpdatedAutomatically {
                compositions: changed.iter().filter_map(|c| graph.get(c).cloned()).collect(),
            });
        }

        Ok(Outcome {
            value: changed,
            events,
            count: graph.len(),
        })
    }

    /// Record metrics, publish events, log the result
    async fn finish<T>(
        &self,
        operation: &'static str,
        result: CompositionResult<Outcome<T>>,
    ) -> CompositionResult<T> {
        match result {
            Ok(outcome) => {
                self.metrics
                    .record_mutation(operation, MutationOutcome::Committed);
                self.metrics.set_composition_count(outcome.count);
                for event in outcome.events {
                    self.publisher.publish(event).await;
                }
                Ok(outcome.value)
            }
            Err(err) if err.is_fatal() => {
                error!(operation, error = %err, "Mutation failed");
                self.metrics.record_mutation(operation, MutationOutcome::Failed);
                Err(err)
            }
            Err(err) => {
                warn!(operation, error = %err, "Mutation rejected");
                self.metrics
                    .record_mutation(operation, MutationOutcome::Rejected);
                Err(err)
            }
        }
    }
}

impl Default for CompositionService {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl CompositionApi for CompositionService {
    async fn create(&self, request: NewComposition) -> CompositionResult<Committed> {
        let now = self.clock.now();
        let result = {
            let mut graph = self.graph.write();
            self.create_locked(&mut graph, request, now)
        };

        let committed = self.finish("create", result).await?;
        info!(
            id = %committed.composition.id,
            status = %committed.status,
            cost = committed.composition.cost,
            "Composition committed"
        );
        Ok(committed)
    }

    async fn get(&self, id: &CompositionId) -> CompositionResult<Composition> {
        let graph = self.graph.read();
        Ok(graph.get_node(id)?.clone())
    }

    async fn list(&self) -> CompositionResult<Vec<Composition>> {
        Ok(self.graph.read().snapshot())
    }

    async fn uses(&self, id: &CompositionId) -> CompositionResult<Vec<Composition>> {
        let graph = self.graph.read();
        graph.get_node(id)?;
        Ok(graph
            .reverse_dependents(id)
            .iter()
            .filter_map(|dependent| graph.get(dependent).cloned())
            .collect())
    }

    async fn update(
        &self,
        id: &CompositionId,
        patch: CompositionPatch,
    ) -> CompositionResult<Committed> {
        let now = self.clock.now();
        let result = {
            let mut graph = self.graph.write();
            self.revise_locked(&mut graph, id, patch, now)
        };

        let committed = self.finish("update", result).await?;
        info!(
            id = %id,
            status = %committed.status,
            recomputed = committed.recomputed.len(),
            "Composition committed"
        );
        Ok(committed)
    }

    async fn upsert_dependency(
        &self,
        id: &CompositionId,
        dependency: DependencyInput,
    ) -> CompositionResult<Committed> {
        let now = self.clock.now();
        let result = {
            let mut graph = self.graph.write();
            graph
                .get_node(id)
                .map_err(CompositionError::from)
                .and_then(|existing| {
                    let mut inputs: Vec<DependencyInput> = existing
                        .dependencies
                        .iter()
                        .map(|d| DependencyInput::new(d.of.clone(), d.quantity.clone()))
                        .collect();
                    match inputs.iter().position(|d| d.of == dependency.of) {
                        Some(i) => inputs[i] = dependency,
                        None => inputs.push(dependency),
                    }
                    Ok(CompositionPatch::default().with_dependencies(inputs))
                })
                .and_then(|patch| self.revise_locked(&mut graph, id, patch, now))
        };

        let committed = self.finish("upsert_dependency", result).await?;
        info!(
            id = %id,
            status = %committed.status,
            recomputed = committed.recomputed.len(),
            "Dependency upserted"
        );
        Ok(committed)
    }

    async fn remove_dependency(
        &self,
        id: &CompositionId,
        of: &CompositionId,
    ) -> CompositionResult<Committed> {
        let now = self.clock.now();
        let result = {
            let mut graph = self.graph.write();
            graph
                .get_node(id)
                .map_err(CompositionError::from)
                .and_then(|existing| {
                    if existing.dependency(of).is_none() {
                        return Err(CompositionError::DependencyNotFound {
                            id: id.clone(),
                            of: of.clone(),
                        });
                    }
                    let inputs = existing
                        .dependencies
                        .iter()
                        .filter(|d| &d.of != of)
                        .map(|d| DependencyInput::new(d.of.clone(), d.quantity.clone()))
                        .collect();
                    Ok(CompositionPatch::default().with_dependencies(inputs))
                })
                .and_then(|patch| self.revise_locked(&mut graph, id, patch, now))
        };

        let committed = self.finish("remove_dependency", result).await?;
        info!(
            id = %id,
            of = %of,
            recomputed = committed.recomputed.len(),
            "Dependency removed"
        );
        Ok(committed)
    }

    async fn delete(&self, id: &CompositionId) -> CompositionResult<OperationStatus> {
        let result = {
            let mut graph = self.graph.write();
            self.delete_locked(&mut graph, id)
        };

        let status = self.finish("delete", result).await?;
        info!(id = %id, status = %status, "Composition deleted");
        Ok(status)
    }

    async fn recalculate(&self, id: &CompositionId) -> CompositionResult<Vec<CompositionId>> {
        let now = self.clock.now();
        let result = {
            let mut graph = self.graph.write();
            self.recalculate_locked(&mut graph, id, now)
        };

        let changed = self.finish("recalculate", result).await?;
        info!(id = %id, changed = changed.len(), "Recalculation complete");
        Ok(changed)
    }
}
