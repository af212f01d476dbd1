//! Dashboard metrics derived from the current task set.

use serde::{Deserialize, Serialize};

use crate::core::{Task, TaskStatus};

/// Point-in-time counts over all known tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    /// Every stored task.
    pub total: usize,
    /// Tasks holding a slot.
    pub running: usize,
    /// Pending tasks that are queue members.
    pub queued: usize,
    /// Finished successfully.
    pub completed: usize,
    /// Failed for good.
    pub failed: usize,
    /// Cancelled by request.
    pub cancelled: usize,
    /// Tasks that have failed at least once and have not completed.
    pub retrying: usize,
    /// Mean `finishedAt - startedAt` over completed tasks, in milliseconds.
    pub average_execution_time_ms: u64,
    /// Occupied execution slots as seen by the scheduler.
    pub in_flight: usize,
    /// Entries in the priority queue.
    pub queue_depth: usize,
    /// Tasks waiting out a retry backoff.
    pub backing_off: usize,
}

impl TaskMetrics {
    /// Count tasks by state.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut metrics = Self {
            total: tasks.len(),
            ..Self::default()
        };
        let mut run_time_total = 0_u64;
        let mut timed = 0_u64;

        for task in tasks {
            match task.status {
                TaskStatus::Running => metrics.running += 1,
                TaskStatus::Pending if task.queued => metrics.queued += 1,
                TaskStatus::Pending => {}
                TaskStatus::Completed => {
                    metrics.completed += 1;
                    if let (Some(started), Some(finished)) = (task.started_at, task.finished_at) {
                        run_time_total += finished.saturating_sub(started);
                        timed += 1;
                    }
                }
                TaskStatus::Failed => metrics.failed += 1,
                TaskStatus::Cancelled => metrics.cancelled += 1,
            }
            if task.retry_count > 0 && task.status != TaskStatus::Completed {
                metrics.retrying += 1;
            }
        }

        if timed > 0 {
            metrics.average_execution_time_ms = run_time_total / timed;
        }
        metrics
    }

    /// Attach the scheduler's live counters.
    #[must_use]
    pub const fn with_runtime(mut self, in_flight: usize, queue_depth: usize, backing_off: usize) -> Self {
        self.in_flight = in_flight;
        self.queue_depth = queue_depth;
        self.backing_off = backing_off;
        self
    }
}
