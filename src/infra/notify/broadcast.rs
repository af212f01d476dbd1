//! Broadcast-channel notification sink for live observers.

use tokio::sync::broadcast;

use crate::core::{NotificationSink, TaskEvent};

/// Fans events out to every subscribed receiver.
///
/// Publishing never blocks; slow receivers observe `RecvError::Lagged` and
/// are expected to re-list tasks to resynchronize.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<TaskEvent>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` events per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Get a receiver for events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, event: TaskEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
