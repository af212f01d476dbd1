//! In-memory task store.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::core::{SchedulerError, Task, TaskStore};
use crate::util::serde::TaskId;

/// Simple in-memory store for development/testing.
///
/// Share it behind an `Arc` to keep state across scheduler restarts in tests.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    records: RwLock<HashMap<TaskId, Task>>,
    index: RwLock<BTreeSet<TaskId>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn put(&self, task: &Task) -> Result<(), SchedulerError> {
        self.records.write().insert(task.id, task.clone());
        Ok(())
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, SchedulerError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.records.write().remove(id);
        Ok(())
    }

    fn index_add(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.index.write().insert(*id);
        Ok(())
    }

    fn index_remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.index.write().remove(id);
        Ok(())
    }

    fn ids(&self) -> Result<Vec<TaskId>, SchedulerError> {
        Ok(self.index.read().iter().copied().collect())
    }
}
