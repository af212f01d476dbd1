//! File-backed priority queue.
//!
//! The in-memory ordering is mirrored to a JSON lines file after every
//! mutation, one `{id, priority, seq}` per line in pop order, so queue
//! membership and tie-break order survive restarts.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::memory::QueueState;
use crate::core::{PriorityQueue, SchedulerError};
use crate::util::serde::{Priority, TaskId};

#[derive(Debug, Serialize, Deserialize)]
struct QueueLine {
    id: TaskId,
    priority: Priority,
    seq: u64,
}

/// File-backed queue using JSON lines for durability.
#[derive(Debug)]
pub struct FilePriorityQueue {
    path: PathBuf,
    state: Mutex<QueueState>,
}

impl FilePriorityQueue {
    /// Open (or create) a queue stored under `dir/queue.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Backend`] if the directory cannot be created
    /// or an existing file cannot be parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(SchedulerError::backend)?;
        let queue = Self {
            path: dir.join("queue.jsonl"),
            state: Mutex::new(QueueState::default()),
        };
        queue.load_from_disk()?;
        Ok(queue)
    }

    fn load_from_disk(&self) -> Result<(), SchedulerError> {
        if !self.path.exists() {
            return Ok(());
        }
        let file = File::open(&self.path).map_err(SchedulerError::backend)?;
        let mut state = self.state.lock();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(SchedulerError::backend)?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: QueueLine = serde_json::from_str(&line).map_err(SchedulerError::backend)?;
            state.insert_with_seq(entry.id, entry.priority, entry.seq);
        }
        tracing::debug!(path = %self.path.display(), len = state.len(), "loaded queue");
        Ok(())
    }

    fn rewrite_disk(&self, state: &QueueState) -> Result<(), SchedulerError> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp).map_err(SchedulerError::backend)?;
            let mut writer = BufWriter::new(file);
            for &(priority, seq, id) in state.entries() {
                let line = serde_json::to_string(&QueueLine { id, priority, seq })
                    .map_err(SchedulerError::backend)?;
                writeln!(writer, "{line}").map_err(SchedulerError::backend)?;
            }
            writer.flush().map_err(SchedulerError::backend)?;
        }
        fs::rename(&tmp, &self.path).map_err(SchedulerError::backend)
    }
}

impl PriorityQueue for FilePriorityQueue {
    fn enqueue(&self, id: TaskId, priority: Priority) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        state.enqueue(id, priority);
        self.rewrite_disk(&state)
    }

    fn pop_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        let mut state = self.state.lock();
        let item = state.pop_min();
        if item.is_some() {
            self.rewrite_disk(&state)?;
        }
        Ok(item)
    }

    fn peek_min(&self) -> Result<Option<TaskId>, SchedulerError> {
        Ok(self.state.lock().peek_min())
    }

    fn remove(&self, id: &TaskId) -> Result<bool, SchedulerError> {
        let mut state = self.state.lock();
        let removed = state.remove(id);
        if removed {
            self.rewrite_disk(&state)?;
        }
        Ok(removed)
    }

    fn score_of(&self, id: &TaskId) -> Result<Option<Priority>, SchedulerError> {
        Ok(self.state.lock().score_of(id))
    }

    fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.state.lock().len())
    }
}
