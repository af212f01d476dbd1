//! Retention sweep for terminal tasks.

use std::time::Duration;

use tracing::{debug, info};

use super::engine::Engine;
use crate::core::{SchedulerError, Task, TaskEvent};
use crate::util::serde::TaskId;

/// Whether a terminal task has outlived the retention window.
///
/// Age is measured from `finished_at`, falling back to `created_at`.
#[must_use]
pub fn is_expired(task: &Task, now_ms: u64, retention: Duration) -> bool {
    let retention_ms = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);
    task.is_terminal() && now_ms.saturating_sub(task.terminal_timestamp()) >= retention_ms
}

impl Engine {
    /// Remove every expired terminal task. Returns how many were removed.
    ///
    /// Terminal tasks hold no slot, so the sweep never wakes the scheduler loop.
    pub(super) fn sweep_expired(&mut self) -> Result<usize, SchedulerError> {
        let now = self.now_ms();
        let retention = self.config.retention();
        let mut removed = 0;
        for task in self.store.list_all()? {
            if is_expired(&task, now, retention) {
                self.remove_completely(&task.id)?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "swept expired tasks");
        } else {
            debug!("cleanup sweep found nothing to remove");
        }
        Ok(removed)
    }

    /// Evict a task from every structure and announce the deletion.
    pub(super) fn remove_completely(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        self.slots.release(id);
        self.retries.cancel(id);
        self.queue.remove(id)?;
        self.store.index_remove(id)?;
        self.store.remove(id)?;
        self.sink.publish(TaskEvent::Deleted { id: *id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NewTask, TaskStatus};

    const HOUR_MS: u64 = 60 * 60 * 1000;

    fn task(status: TaskStatus, created_at: u64, finished_at: Option<u64>) -> Task {
        let mut task = Task::new(
            TaskId::new(),
            NewTask::new("old", 1, false, None).unwrap(),
            3,
            created_at,
        );
        task.status = status;
        task.finished_at = finished_at;
        task
    }

    #[test]
    fn expiry_uses_finished_at() {
        let retention = Duration::from_secs(6 * 60 * 60);
        let now = 100 * HOUR_MS;
        assert!(is_expired(&task(TaskStatus::Completed, 0, Some(now - 6 * HOUR_MS)), now, retention));
        assert!(!is_expired(&task(TaskStatus::Failed, 0, Some(now - 5 * HOUR_MS)), now, retention));
    }

    #[test]
    fn expiry_falls_back_to_created_at() {
        let retention = Duration::from_secs(60);
        assert!(is_expired(&task(TaskStatus::Cancelled, 0, None), 60_000, retention));
        assert!(!is_expired(&task(TaskStatus::Cancelled, 10, None), 60_000, retention));
    }

    #[test]
    fn active_tasks_never_expire() {
        let retention = Duration::from_secs(1);
        assert!(!is_expired(&task(TaskStatus::Pending, 0, None), u64::MAX, retention));
        assert!(!is_expired(&task(TaskStatus::Running, 0, None), u64::MAX, retention));
    }
}
