//! Fan-out of raffle events to background subscribers.

use raffle::events::{EventSink, RaffleEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Event sink backed by a tokio broadcast channel.
///
/// `emit` never blocks; slow subscribers observe `Lagged` instead of stalling
/// the raffle.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<RaffleEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: RaffleEvent) {
        let name = event.name();
        // Err only means nobody is listening.
        if self.tx.send(event).is_err() {
            debug!(event = name, "No event subscribers");
        }
    }
}
