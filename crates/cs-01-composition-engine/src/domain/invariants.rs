//! Domain invariants for the Composition graph
//!
//! Whole-graph checks. The service only validates the affected subgraph on
//! each mutation; these are used by debug assertions and property tests.

use super::entities::CompositionId;
use super::graph::CompositionGraph;
use super::quantity::unit_price;
use std::collections::{HashMap, HashSet};

/// INVARIANT-1: Acyclic
/// The dependency relation forms a DAG.
pub fn invariant_acyclic(graph: &CompositionGraph) -> bool {
    // 0 = unvisited, 1 = on stack, 2 = done
    let mut state: HashMap<&CompositionId, u8> = HashMap::new();

    for root in graph.iter() {
        if state.contains_key(&root.id) {
            continue;
        }
        let mut stack: Vec<(&CompositionId, usize)> = vec![(&root.id, 0)];
        state.insert(&root.id, 1);

        while let Some((id, cursor)) = stack.pop() {
            let Some(node) = graph.get(id) else {
                state.insert(id, 2);
                continue;
            };
            match node.dependencies.get(cursor) {
                Some(dep) => {
                    stack.push((id, cursor + 1));
                    match state.get(&dep.of) {
                        Some(1) => return false,
                        Some(_) => {}
                        None => {
                            state.insert(&dep.of, 1);
                            stack.push((&dep.of, 0));
                        }
                    }
                }
                None => {
                    state.insert(id, 2);
                }
            }
        }
    }

    true
}

/// INVARIANT-2: References Resolve
/// Every `of` names an existing Composition.
pub fn invariant_references_resolve(graph: &CompositionGraph) -> bool {
    graph
        .iter()
        .flat_map(|node| node.dependency_ids())
        .all(|of| graph.contains(of))
}

/// INVARIANT-3: Reverse Index Consistent
/// The reverse index is exactly the transpose of the forward edges.
pub fn invariant_reverse_index_consistent(graph: &CompositionGraph) -> bool {
    let mut expected: HashMap<CompositionId, HashSet<CompositionId>> = HashMap::new();
    for node in graph.iter() {
        for of in node.dependency_ids() {
            expected
                .entry(of.clone())
                .or_default()
                .insert(node.id.clone());
        }
    }
    &expected == graph.reverse_index()
}

/// INVARIANT-4: Costs Consistent
/// Every subvalue matches its referenced unit price, and auto-costed nodes
/// with dependencies carry the sum of their subvalues.
pub fn invariant_costs_consistent(graph: &CompositionGraph) -> bool {
    for node in graph.iter() {
        for dep in &node.dependencies {
            let Some(target) = graph.get(&dep.of) else {
                return false;
            };
            let Ok(price) = unit_price(target.cost, &target.unit) else {
                return false;
            };
            if dep.subvalue != dep.quantity.amount * price {
                return false;
            }
        }
        if node.autoupdate_cost && node.has_dependencies() && node.cost != node.subvalue_total() {
            return false;
        }
    }
    true
}

/// INVARIANT-5: Propagation Current
/// No committed node is left waiting for propagation.
pub fn invariant_propagation_current(graph: &CompositionGraph) -> bool {
    graph.iter().all(|node| node.uses_updated_since_last_change)
}

/// Run every invariant
pub fn check_all(graph: &CompositionGraph) -> bool {
    invariant_acyclic(graph)
        && invariant_references_resolve(graph)
        && invariant_reverse_index_consistent(graph)
        && invariant_costs_consistent(graph)
        && invariant_propagation_current(graph)
}
