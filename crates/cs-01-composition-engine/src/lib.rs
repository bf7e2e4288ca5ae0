//! # CS-01: Composition Engine
//!
//! Dependency graph valuation for Compositions: items whose cost is either set
//! directly or derived from a quantity-weighted graph of sub-item dependencies.
//!
//! ## Architecture
//!
//! - **Domain**: Quantity value type, Composition/Dependency entities, the
//!   graph store (arena + forward/reverse edges), errors, invariants, events
//! - **Algorithms**: Integrity validation (cycles, dangling references) and
//!   cost propagation (ancestor discovery + Kahn's topological order)
//! - **Ports**: Inbound (`CompositionApi`) and Outbound (`CompositionRepository`,
//!   `EventPublisher`, `Clock`, `MetricsSink`)
//! - **Adapters**: In-memory and JSON file repositories, broadcast events, clocks
//! - **Application**: `CompositionService`, the atomic update orchestrator
//!
//! ## Commit Pipeline
//!
//! ```text
//! request ─→ schema check ─→ validate subgraph ─→ mutate store
//!                                                      │
//!              persist ←─ apply plan ←─ plan propagation (ancestors, topo order)
//!                 │
//!                 └─→ release write lock ─→ publish events
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::service::CompositionService;
pub use config::EngineConfig;
pub use domain::entities::*;
pub use domain::errors::{CompositionError, CompositionResult};
pub use domain::events::CompositionEvent;
pub use domain::graph::CompositionGraph;
pub use domain::quantity::{unit_price, Quantity, QuantityError};
pub use ports::inbound::CompositionApi;
pub use ports::outbound::{
    ChangeSet, Clock, CompositionRepository, EventPublisher, MetricsSink, MutationOutcome,
};
