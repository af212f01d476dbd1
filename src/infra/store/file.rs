//! File-backed task store.
//!
//! Layout under the root directory:
//! - `tasks/<id>.json`: one record per task
//! - `index.json`: array of every known task id
//!
//! Files are written to a temporary sibling and renamed into place.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::{SchedulerError, Task, TaskStore};
use crate::util::serde::TaskId;

/// Durable store keeping JSON documents on disk.
#[derive(Debug)]
pub struct FileTaskStore {
    root: PathBuf,
    /// Serializes index read-modify-write cycles.
    index_lock: Mutex<()>,
}

impl FileTaskStore {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Backend`] if the directories cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let root = dir.as_ref().to_path_buf();
        fs::create_dir_all(root.join("tasks")).map_err(SchedulerError::backend)?;
        Ok(Self {
            root,
            index_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: &TaskId) -> PathBuf {
        self.root.join("tasks").join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn read_index(&self) -> Result<BTreeSet<TaskId>, SchedulerError> {
        match fs::read(self.index_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(SchedulerError::backend),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(SchedulerError::backend(e)),
        }
    }

    fn write_index(&self, index: &BTreeSet<TaskId>) -> Result<(), SchedulerError> {
        let bytes = serde_json::to_vec(index).map_err(SchedulerError::backend)?;
        write_atomic(&self.index_path(), &bytes)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SchedulerError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(SchedulerError::backend)?;
    fs::rename(&tmp, path).map_err(SchedulerError::backend)
}

impl TaskStore for FileTaskStore {
    fn put(&self, task: &Task) -> Result<(), SchedulerError> {
        let bytes = serde_json::to_vec_pretty(task).map_err(SchedulerError::backend)?;
        write_atomic(&self.record_path(&task.id), &bytes)
    }

    fn get(&self, id: &TaskId) -> Result<Option<Task>, SchedulerError> {
        match fs::read(self.record_path(id)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(SchedulerError::backend),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SchedulerError::backend(e)),
        }
    }

    fn remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        match fs::remove_file(self.record_path(id)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(SchedulerError::backend(e)),
            _ => Ok(()),
        }
    }

    fn index_add(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index()?;
        if index.insert(*id) {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn index_remove(&self, id: &TaskId) -> Result<(), SchedulerError> {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index()?;
        if index.remove(id) {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn ids(&self) -> Result<Vec<TaskId>, SchedulerError> {
        Ok(self.read_index()?.into_iter().collect())
    }
}
