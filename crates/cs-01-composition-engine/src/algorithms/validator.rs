//! Integrity Validator
//!
//! Cycle and reference checks over the subgraph reachable from a mutated
//! node. Checks run against a [`GraphView`] so a candidate node can be
//! validated without touching the committed store.

use crate::domain::entities::{Composition, CompositionId, Dependency};
use crate::domain::errors::ValidationError;
use crate::domain::graph::CompositionGraph;
use crate::domain::quantity::Quantity;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Committed graph, optionally overlaid with one candidate node
#[derive(Clone, Copy)]
pub struct GraphView<'a> {
    graph: &'a CompositionGraph,
    candidate: Option<&'a Composition>,
}

impl<'a> GraphView<'a> {
    pub fn committed(graph: &'a CompositionGraph) -> Self {
        Self {
            graph,
            candidate: None,
        }
    }

    /// View where `candidate` replaces (or adds) the node with its id
    pub fn with_candidate(graph: &'a CompositionGraph, candidate: &'a Composition) -> Self {
        Self {
            graph,
            candidate: Some(candidate),
        }
    }

    pub fn node(&self, id: &CompositionId) -> Option<&'a Composition> {
        match self.candidate {
            Some(candidate) if &candidate.id == id => Some(candidate),
            _ => self.graph.get(id),
        }
    }

    pub fn dependencies(&self, id: &CompositionId) -> Option<&'a [Dependency]> {
        self.node(id).map(|node| node.dependencies.as_slice())
    }

    pub fn unit_of(&self, id: &CompositionId) -> Option<&'a Quantity> {
        self.node(id).map(|node| &node.unit)
    }

    pub fn contains(&self, id: &CompositionId) -> bool {
        self.node(id).is_some()
    }
}

/// Depth-first search from `start` with an explicit recursion stack.
///
/// Fails with `CycleDetected` when a node already on the stack is reached
/// again; the path starts and ends with that node. Unknown ids are skipped.
pub fn check_acyclic(view: &GraphView<'_>, start: &CompositionId) -> Result<(), ValidationError> {
    let Some(root) = view.dependencies(start) else {
        return Ok(());
    };

    let mut stack: Vec<(&CompositionId, &[Dependency], usize)> = vec![(start, root, 0)];
    let mut on_stack: HashSet<&CompositionId> = HashSet::from([start]);
    let mut done: HashSet<&CompositionId> = HashSet::new();

    while let Some(frame) = stack.last_mut() {
        let (id, deps, cursor) = *frame;
        let Some(dep) = deps.get(cursor) else {
            stack.pop();
            on_stack.remove(id);
            done.insert(id);
            continue;
        };
        frame.2 += 1;

        let next = &dep.of;
        if on_stack.contains(next) {
            let from = stack
                .iter()
                .position(|(frame_id, _, _)| *frame_id == next)
                .unwrap_or(0);
            let mut path: Vec<CompositionId> =
                stack[from..].iter().map(|(id, _, _)| (*id).clone()).collect();
            path.push(next.clone());
            debug!(path = ?path, "Cycle detected");
            return Err(ValidationError::CycleDetected { path });
        }
        if done.contains(next) {
            continue;
        }
        if let Some(child) = view.dependencies(next) {
            on_stack.insert(next);
            stack.push((next, child, 0));
        }
    }

    Ok(())
}

/// Every edge of `id` resolves, and its quantity uses the referenced unit
pub fn check_references(view: &GraphView<'_>, id: &CompositionId) -> Result<(), ValidationError> {
    let Some(deps) = view.dependencies(id) else {
        return Ok(());
    };

    for dep in deps {
        let Some(unit) = view.unit_of(&dep.of) else {
            return Err(ValidationError::DanglingDependency {
                id: id.clone(),
                missing: dep.of.clone(),
            });
        };
        if !dep.quantity.compatible(unit) {
            return Err(ValidationError::UnitMismatch {
                left: dep.quantity.unit.clone(),
                right: unit.unit.clone(),
            });
        }
    }

    Ok(())
}

/// Run both checks over every node reachable from `start`.
///
/// Returns the visited ids in breadth-first order.
pub fn validate_subgraph(
    view: &GraphView<'_>,
    start: &CompositionId,
) -> Result<Vec<CompositionId>, ValidationError> {
    check_acyclic(view, start)?;

    let mut visited: Vec<CompositionId> = Vec::new();
    let mut seen: HashSet<&CompositionId> = HashSet::from([start]);
    let mut queue: VecDeque<&CompositionId> = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        check_references(view, id)?;
        visited.push(id.clone());

        for dep in view.dependencies(id).unwrap_or_default() {
            if seen.insert(&dep.of) {
                queue.push_back(&dep.of);
            }
        }
    }

    debug!(start = %start, nodes = visited.len(), "Subgraph validated");
    Ok(visited)
}
