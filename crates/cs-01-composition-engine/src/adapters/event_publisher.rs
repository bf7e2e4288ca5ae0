//! Event publisher adapters

use crate::domain::events::CompositionEvent;
use crate::ports::outbound::EventPublisher;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Default channel capacity for the broadcast publisher
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Fan-out publisher over `tokio::sync::broadcast`.
///
/// Events published with no live subscriber are dropped.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<CompositionEvent>,
    events_published: AtomicU64,
}

impl BroadcastEventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompositionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: CompositionEvent) -> usize {
        let kind = event.kind();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(kind, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(kind, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

/// Publisher that drops everything
#[derive(Debug, Default)]
pub struct NoopEventPublisher {
    events_published: AtomicU64,
}

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: CompositionEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        0
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
