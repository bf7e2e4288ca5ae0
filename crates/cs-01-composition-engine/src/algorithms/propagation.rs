//! Cost Propagation Engine
//!
//! Recomputes subvalues and derived costs for a changed node and every
//! ancestor, dependencies before dependents. Planning is pure; the plan is
//! applied to the store in one pass.

use crate::domain::entities::CompositionId;
use crate::domain::errors::PropagationError;
use crate::domain::graph::CompositionGraph;
use crate::domain::quantity::unit_price;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// `id` plus every node whose dependency chain reaches it
pub fn collect_ancestors(graph: &CompositionGraph, id: &CompositionId) -> HashSet<CompositionId> {
    let mut found: HashSet<CompositionId> = HashSet::from([id.clone()]);
    let mut queue: VecDeque<CompositionId> = VecDeque::from([id.clone()]);

    while let Some(current) = queue.pop_front() {
        for dependent in graph.reverse_dependents(&current) {
            if found.insert(dependent.clone()) {
                queue.push_back(dependent);
            }
        }
    }

    found
}

/// Kahn's algorithm over the sub-DAG induced by `subset`.
///
/// Dependencies come before dependents; each layer is sorted by id so the
/// order is deterministic.
pub fn topological_order(
    graph: &CompositionGraph,
    subset: &HashSet<CompositionId>,
) -> Result<Vec<CompositionId>, PropagationError> {
    // 1. In-degree = distinct dependencies inside the subset
    let mut in_degree: HashMap<&CompositionId, usize> = HashMap::with_capacity(subset.len());
    for id in subset {
        let node = graph.get(id).ok_or_else(|| {
            PropagationError::InvariantViolation(format!("node {id} missing from graph"))
        })?;
        let inside: HashSet<&CompositionId> = node
            .dependency_ids()
            .filter(|of| subset.contains(*of))
            .collect();
        in_degree.insert(id, inside.len());
    }

    // 2. Seed with nodes whose dependencies are all outside the subset
    let mut queue: Vec<&CompositionId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.sort();

    // 3. Peel layers
    let mut order: Vec<CompositionId> = Vec::with_capacity(subset.len());
    while !queue.is_empty() {
        let layer = std::mem::take(&mut queue);
        let mut next: Vec<&CompositionId> = Vec::new();

        for id in &layer {
            for dependent in graph.reverse_dependents(id) {
                let Some((key, degree)) = in_degree.get_key_value(&dependent) else {
                    continue;
                };
                let key = *key;
                let remaining = degree.saturating_sub(1);
                in_degree.insert(key, remaining);
                if remaining == 0 {
                    next.push(key);
                }
            }
        }

        order.extend(layer.into_iter().cloned());
        next.sort();
        queue = next;
    }

    // 4. Leftovers can only sit on a cycle
    if order.len() < subset.len() {
        return Err(PropagationError::InvariantViolation(format!(
            "cycle among {} node(s) during propagation",
            subset.len() - order.len()
        )));
    }

    Ok(order)
}

/// Recomputed values for one node
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedNode {
    pub id: CompositionId,
    pub cost: f64,
    /// One entry per dependency, in declaration order
    pub subvalues: Vec<f64>,
}

/// Ordered recomputation, ready to be written to the store
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropagationPlan {
    entries: Vec<PlannedNode>,
}

impl PropagationPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlannedNode] {
        &self.entries
    }

    /// Ids in application order
    pub fn order(&self) -> impl Iterator<Item = &CompositionId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Write planned values and mark each node as propagated.
    ///
    /// Returns the ids whose cost or any subvalue actually changed.
    pub fn apply(self, graph: &mut CompositionGraph) -> Vec<CompositionId> {
        let mut changed = Vec::new();

        for entry in self.entries {
            let Some(node) = graph.get_node_mut(&entry.id) else {
                continue;
            };
            let mut differs = node.cost != entry.cost;
            node.cost = entry.cost;
            for (dep, subvalue) in node.dependencies.iter_mut().zip(entry.subvalues) {
                differs |= dep.subvalue != subvalue;
                dep.subvalue = subvalue;
            }
            node.uses_updated_since_last_change = true;
            if differs {
                changed.push(entry.id);
            }
        }

        changed
    }
}

/// Plan propagation rooted at `changed`: the node itself and all its ancestors
pub fn plan_propagation(
    graph: &CompositionGraph,
    changed: &CompositionId,
) -> Result<PropagationPlan, PropagationError> {
    let subset = collect_ancestors(graph, changed);
    plan_subset(graph, &subset)
}

/// Plan propagation over an arbitrary ancestor-closed set of nodes
pub fn plan_subset(
    graph: &CompositionGraph,
    subset: &HashSet<CompositionId>,
) -> Result<PropagationPlan, PropagationError> {
    let order = topological_order(graph, subset)?;
    let mut planned: HashMap<&CompositionId, f64> = HashMap::with_capacity(order.len());
    let mut entries = Vec::with_capacity(order.len());

    for id in &order {
        let node = graph.get(id).ok_or_else(|| {
            PropagationError::InvariantViolation(format!("node {id} missing from graph"))
        })?;

        let mut subvalues = Vec::with_capacity(node.dependencies.len());
        for dep in &node.dependencies {
            let target = graph.get(&dep.of).ok_or_else(|| {
                PropagationError::InvariantViolation(format!(
                    "{id} depends on missing node {}",
                    dep.of
                ))
            })?;
            dep.quantity
                .ensure_compatible(&target.unit)
                .map_err(|e| PropagationError::InvariantViolation(format!("{id}: {e}")))?;

            let cost = planned.get(&dep.of).copied().unwrap_or(target.cost);
            let price = unit_price(cost, &target.unit)
                .map_err(|e| PropagationError::InvariantViolation(format!("{id}: {e}")))?;
            let subvalue = dep.quantity.amount * price;
            if !subvalue.is_finite() {
                return Err(PropagationError::CostOverflow { id: id.clone() });
            }
            subvalues.push(subvalue);
        }

        // Leaves keep their cost even when auto-costed
        let cost = if node.autoupdate_cost && !subvalues.is_empty() {
            subvalues.iter().sum::<f64>()
        } else {
            node.cost
        };
        if !cost.is_finite() {
            return Err(PropagationError::CostOverflow { id: id.clone() });
        }

        planned.insert(id, cost);
        entries.push(PlannedNode {
            id: id.clone(),
            cost,
            subvalues,
        });
    }

    debug!(nodes = entries.len(), "Propagation planned");
    Ok(PropagationPlan { entries })
}
