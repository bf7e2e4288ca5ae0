//! Logs every published composition event.

use cs_01_composition_engine::CompositionEvent;
use cs_telemetry::log_event;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Follow `events` until shutdown is signalled or the channel closes
pub fn spawn_event_logger(
    mut events: broadcast::Receiver<CompositionEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = events.recv() => match received {
                    Ok(event) => log_composition_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log_event!(warn, "events", "Event logger lagged", skipped = skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

fn log_composition_event(event: &CompositionEvent) {
    match event {
        CompositionEvent::Created { composition }
        | CompositionEvent::UpdatedManually { composition } => {
            log_event!(
                debug,
                "events",
                "Composition event",
                kind = event.kind(),
                id = %composition.id,
                cost = composition.cost
            );
        }
        CompositionEvent::UpdatedAutomatically { compositions } => {
            log_event!(
                debug,
                "events",
                "Composition event",
                kind = event.kind(),
                count = compositions.len()
            );
        }
        CompositionEvent::Deleted { id } => {
            log_event!(debug, "events", "Composition event", kind = event.kind(), id = %id);
        }
    }
}
