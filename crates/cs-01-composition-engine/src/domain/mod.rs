//! Domain module for the Composition Engine
//!
//! Contains the quantity value type, entities, the graph store, errors,
//! invariants and events.

pub mod entities;
pub mod errors;
pub mod events;
pub mod graph;
pub mod invariants;
pub mod quantity;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use graph::*;
pub use quantity::*;
