//! Frame events published by the ticker
//!
//! One `Boundary` per tick, one `Stopped` when the host shuts down.
//! A subscriber that falls behind sees `RecvError::Lagged`; the ticker
//! never waits for it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published by the ticker host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameEvent {
    /// A boundary finished running `callbacks` registrations
    Boundary { frame: u64, callbacks: usize },
    Stopped,
}

/// Fan-out of frame events to any number of observers
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<FrameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    pub fn publish(&self, event: FrameEvent) {
        // Nobody watching is the common case
        let _ = self.tx.send(event);
    }

    /// Receiver for events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FrameEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
