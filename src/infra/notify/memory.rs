//! In-memory notification sink.

use parking_lot::Mutex;

use crate::core::{NotificationSink, TaskEvent, TaskView};
use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Recorded notification.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// The event as published.
    pub event: TaskEvent,
    /// Wall-clock milliseconds when it was recorded.
    pub recorded_at_ms: u64,
}

/// Sink that keeps every event, for development and tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl InMemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// Update payloads published for one task, oldest first.
    #[must_use]
    pub fn updates_for(&self, id: &TaskId) -> Vec<TaskView> {
        self.events
            .lock()
            .iter()
            .filter_map(|r| match &r.event {
                TaskEvent::Updated(view) if &view.task.id == id => Some(view.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids announced as deleted, oldest first.
    #[must_use]
    pub fn deletions(&self) -> Vec<TaskId> {
        self.events
            .lock()
            .iter()
            .filter_map(|r| match r.event {
                TaskEvent::Deleted { id } => Some(id),
                TaskEvent::Updated(_) => None,
            })
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl NotificationSink for InMemorySink {
    fn publish(&self, event: TaskEvent) {
        self.events.lock().push(RecordedEvent {
            event,
            recorded_at_ms: now_ms(),
        });
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn publish(&self, _event: TaskEvent) {}
}
