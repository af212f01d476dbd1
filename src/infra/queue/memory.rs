//! In-memory priority queue keyed by task id.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::core::{PriorityQueue, SchedulerError};
use crate::util::serde::{Priority, TaskId};

/// Ordering key: lowest priority value first, then insertion sequence (FIFO
/// within a priority), then id so keys are always unique.
type QueueKey = (Priority, u64, TaskId);

/// Plain queue state, shared with the file-backed queue.
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    ordered: BTreeSet<QueueKey>,
    members: HashMap<TaskId, (Priority, u64)>,
    next_seq: u64,
}

impl QueueState {
    pub(crate) fn enqueue(&mut self, id: TaskId, priority: Priority) {
        if let Some(&(current, seq)) = self.members.get(&id) {
            if current == priority {
                return;
            }
            self.ordered.remove(&(current, seq, id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insert_with_seq(id, priority, seq);
    }

    /// Restore an entry with a known sequence number (used when reloading).
    pub(crate) fn insert_with_seq(&mut self, id: TaskId, priority: Priority, seq: u64) {
        if let Some((old_priority, old_seq)) = self.members.insert(id, (priority, seq)) {
            self.ordered.remove(&(old_priority, old_seq, id));
        }
        self.ordered.insert((priority, seq, id));
        self.next_seq = self.next_seq.max(seq + 1);
    }

    pub(crate) fn pop_min(&mut self) -> Option<TaskId> {
        let (_, _, id) = self.ordered.pop_first()?;
        self.members.remove(&id);
        Some(id)
    }

    pub(crate) fn peek_min(&self) -> Option<TaskId> {
        self.ordered.first().map(|&(_, _, id)| id)
    }

    pub(crate) fn remove(&mut self, id: &TaskId) -> bool {
        match self.members.remove(id) {
            Some((priority, seq)) => {
                self.ordered.remove(&(priority, seq, *id));
                true
            }
            None => false,
        }
    }

    pub(crate) fn score_of(&self, id: &TaskId) -> Option<Priority> {
        self.members.get(id).map(|&(priority, _)| priority)
    }

    pub(crate) fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Entries in pop order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = &QueueKey> {
        self.ordered.iter()
    }
}

/// In-memory queue for development/testing.
/// Every operation is O(log n).
#[derive(Debug, Default)]
pub struct InMemoryPriorityQueue {
    state: Mutex<QueueState>,
}

impl InMemoryPriorityQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids in the order they would be popped.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TaskId> {
        self.state.lock().entries().map(|&(_, _, id)| id).collect()
    }
}

impl PriorityQueue for InMemoryPriorityQueue {
    fn enqueue(&self, id: TaskId, priority: Priority) -> Result<(), SchedulerError> {
        self.state.lock().enqueue(id, priority);
        Ok(())
    }

    fn pop_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        Ok(self.state.lock().pop_min())
    }

    fn peek_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        Ok(self.state.lock().peek_min())
    }

    fn remove(&self, id: &TaskId) -> Result<bool, SchedulerError> {
        Ok(self.state.lock().remove(id))
    }

    fn score_of(&self, id: &TaskId) -> Result<Option<Priority>, SchedulerError> {
        Ok(self.state.lock().score_of(id))
    }

    fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.state.lock().len())
    }
}
