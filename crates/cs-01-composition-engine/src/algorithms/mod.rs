//! Algorithms module for the Composition Engine
//!
//! Integrity validation and cost propagation.

pub mod propagation;
pub mod validator;

pub use propagation::{
    collect_ancestors, plan_propagation, plan_subset, topological_order, PlannedNode,
    PropagationPlan,
};
pub use validator::{check_acyclic, check_references, validate_subgraph, GraphView};
