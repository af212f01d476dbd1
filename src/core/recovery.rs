//! Crash recovery - reconciles persisted state after a restart.
//!
//! Slot counts and timers live only in memory. A task persisted as `running`
//! lost its completion timer with the previous process and would stay stuck,
//! so recovery puts it back in the queue. This must run before the scheduler
//! loop first fills slots.
//!
//! Assumes a single scheduler process per store.

use tracing::{info, warn};

use crate::core::{PriorityQueue, SchedulerError, TaskStatus, TaskStore};

/// What recovery changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Tasks found `running` and requeued.
    pub requeued_running: usize,
    /// Pending tasks whose retry backoff timer was lost, requeued.
    pub requeued_backoff: usize,
    /// Tasks flagged `queued` but missing from the queue, re-inserted.
    pub restored_membership: usize,
    /// Queue entries whose task is not awaiting a slot, evicted.
    pub evicted_entries: usize,
}

impl RecoveryReport {
    /// Whether anything was changed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.requeued_running == 0
            && self.requeued_backoff == 0
            && self.restored_membership == 0
            && self.evicted_entries == 0
    }
}

/// Recover all interrupted tasks.
///
/// # Errors
///
/// Propagates store and queue failures; recovery may be re-run safely.
pub fn recover(
    store: &dyn TaskStore,
    queue: &dyn PriorityQueue,
    now_ms: u64,
) -> Result<RecoveryReport, SchedulerError> {
    let mut report = RecoveryReport::default();

    for mut task in store.list_all()? {
        match task.status {
            TaskStatus::Running => {
                task.status = TaskStatus::Pending;
                task.queued = true;
                task.push_log(now_ms, "Requeued after restart");
                store.put(&task)?;
                queue.enqueue(task.id, task.priority)?;
                report.requeued_running += 1;
                warn!(task_id = %task.id, "interrupted task requeued");
            }
            TaskStatus::Pending if task.queued => {
                if queue.score_of(&task.id)?.is_none() {
                    queue.enqueue(task.id, task.priority)?;
                    report.restored_membership += 1;
                }
            }
            TaskStatus::Pending if task.retry_count > 0 => {
                task.queued = true;
                task.push_log(now_ms, "Requeued after restart");
                store.put(&task)?;
                queue.enqueue(task.id, task.priority)?;
                report.requeued_backoff += 1;
                warn!(task_id = %task.id, retry_count = task.retry_count, "lost retry backoff, task requeued");
            }
            _ => {
                if queue.remove(&task.id)? {
                    report.evicted_entries += 1;
                }
            }
        }
    }

    if !report.is_clean() {
        info!(?report, "recovery reconciled persisted state");
    }
    Ok(report)
}
