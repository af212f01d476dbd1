//! Storage, queue and notification seams the scheduler core runs against.
//!
//! The core owns all read-modify-write ordering; backends only promise
//! last-write-wins per key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::task::{Task, TaskView};
use crate::core::SchedulerError;
use crate::util::serde::{Priority, TaskId};

/// Durable key/value persistence of task records plus the "all ids" index.
pub trait TaskStore: Send + Sync + 'static {
    /// Insert or overwrite a task record.
    fn put(&self, task: &Task) -> Result<(), SchedulerError>;
    /// Load a task record.
    fn get(&self, id: &TaskId) -> Result<Option<Task>, SchedulerError>;
    /// Delete a task record (no error if absent).
    fn remove(&self, id: &TaskId) -> Result<(), SchedulerError>;
    /// Add an id to the "all ids" index.
    fn index_add(&self, id: &TaskId) -> Result<(), SchedulerError>;
    /// Remove an id from the "all ids" index.
    fn index_remove(&self, id: &TaskId) -> Result<(), SchedulerError>;
    /// Every indexed id.
    fn ids(&self) -> Result<Vec<TaskId>, SchedulerError>;

    /// Every indexed task. Ids whose record has vanished are skipped.
    fn list_all(&self) -> Result<Vec<Task>, SchedulerError> {
        let mut tasks = Vec::new();
        for id in self.ids()? {
            if let Some(task) = self.get(&id)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }
}

/// Ordered id → priority membership, popped lowest value first.
pub trait PriorityQueue: Send + Sync + 'static {
    /// Insert or update membership.
    fn enqueue(&self, id: TaskId, priority: Priority) -> Result<(), SchedulerError>;
    /// Remove and return the entry with the smallest priority value.
    fn pop_min(&self) -> Result<Option<TaskId>, SchedulerError>;
    /// The entry `pop_min` would return, left in place.
    fn peek_min(&self) -> Result<Option<TaskId>, SchedulerError>;
    /// Evict a member; returns whether it was present.
    fn remove(&self, id: &TaskId) -> Result<bool, SchedulerError>;
    /// Priority of a member, `None` if absent.
    fn score_of(&self, id: &TaskId) -> Result<Option<Priority>, SchedulerError>;
    /// Number of members.
    fn len(&self) -> Result<usize, SchedulerError>;

    /// Whether the queue has no members.
    fn is_empty(&self) -> Result<bool, SchedulerError> {
        Ok(self.len()? == 0)
    }
}

/// Change notification pushed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum TaskEvent {
    /// Full current record after a mutation.
    #[serde(rename = "task:update")]
    Updated(TaskView),
    /// The task was removed.
    #[serde(rename = "task:delete")]
    Deleted {
        /// Removed task.
        id: TaskId,
    },
}

impl TaskEvent {
    /// Task this event concerns.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Updated(view) => &view.task.id,
            Self::Deleted { id } => id,
        }
    }
}

/// Fire-and-forget broadcast of task changes.
pub trait NotificationSink: Send + Sync + 'static {
    /// Publish an event. Delivery failures are the sink's concern.
    fn publish(&self, event: TaskEvent);
}

impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    fn put(&self, task: &Task) -> Result<(), SchedulerError> {
        (**self).put(task)
    }
    fn get(&self, id: &TaskId) -> Result<Option<Task>, SchedulerError> {
        (**self).get(id)
    }
    fn remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        (**self).remove(id)
    }
    fn index_add(&self, id: &TaskId) -> Result<(), SchedulerError> {
        (**self).index_add(id)
    }
    fn index_remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        (**self).index_remove(id)
    }
    fn ids(&self) -> Result<Vec<TaskId>, SchedulerError> {
        (**self).ids()
    }
}

impl<T: PriorityQueue + ?Sized> PriorityQueue for Arc<T> {
    fn enqueue(&self, id: TaskId, priority: Priority) -> Result<(), SchedulerError> {
        (**self).enqueue(id, priority)
    }
    fn pop_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        (**self).pop_min()
    }
    fn peek_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        (**self).peek_min()
    }
    fn remove(&self, id: &TaskId) -> Result<bool, SchedulerError> {
        (**self).remove(id)
    }
    fn score_of(&self, id: &TaskId) -> Result<Option<Priority>, SchedulerError> {
        (**self).score_of(id)
    }
    fn len(&self) -> Result<usize, SchedulerError> {
        (**self).len()
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn publish(&self, event: TaskEvent) {
        (**self).publish(event);
    }
}
