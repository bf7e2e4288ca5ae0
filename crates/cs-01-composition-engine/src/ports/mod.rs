//! Ports module for the Composition Engine
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::CompositionApi;
pub use outbound::{
    ChangeSet, Clock, CompositionRepository, EventPublisher, MetricsSink, MutationOutcome,
    NoopMetricsSink,
};
