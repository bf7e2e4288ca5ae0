//! Adapters for the Composition Engine
//!
//! Concrete implementations of the outbound ports.

pub mod clock;
pub mod event_publisher;
pub mod file_repository;
pub mod memory_repository;

pub use clock::{FixedClock, SystemClock};
pub use event_publisher::{BroadcastEventPublisher, NoopEventPublisher};
pub use file_repository::JsonFileRepository;
pub use memory_repository::InMemoryRepository;
