//! Retry/backoff controller.
//!
//! A failed simulated run either goes back to `pending` and is requeued once
//! its backoff delay elapses, or fails for good when retries are exhausted.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::engine::{Engine, Message, BACKEND_RETRY_DELAY};
use crate::core::{SchedulerError, Task, TaskStatus};
use crate::runtime::timer::TimerHandle;
use crate::util::serde::TaskId;

/// Error message recorded on tasks that exhaust their retries.
pub const RETRIES_EXHAUSTED: &str = "Task failed after retries";

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base of the exponent, in seconds.
    pub base_secs: u64,
}

impl RetryPolicy {
    /// Delay before the retry numbered `retry_count` (1 for the first retry).
    ///
    /// `base^retry_count` seconds, saturating on overflow:
    /// with base 2 the delays are 2s, 4s, 8s, ...
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        Duration::from_secs(self.base_secs.saturating_pow(retry_count))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { base_secs: 2 }
    }
}

struct PendingRetry {
    epoch: u64,
    _timer: TimerHandle,
}

/// Outstanding backoff timers, one per task at most.
#[derive(Default)]
pub(crate) struct RetryTimers {
    pending: HashMap<TaskId, PendingRetry>,
}

impl RetryTimers {
    pub(crate) fn schedule(&mut self, id: TaskId, epoch: u64, timer: TimerHandle) {
        self.pending.insert(id, PendingRetry { epoch, _timer: timer });
    }

    /// Claim the timer that fired; stale epochs are rejected.
    pub(crate) fn take(&mut self, id: &TaskId, epoch: u64) -> bool {
        match self.pending.get(id) {
            Some(retry) if retry.epoch == epoch => {
                self.pending.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Drop (and thereby cancel) any outstanding timer for `id`.
    pub(crate) fn cancel(&mut self, id: &TaskId) -> bool {
        self.pending.remove(id).is_some()
    }

    pub(crate) fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Engine {
    /// Route a failed run: back off and retry, or fail for good.
    pub(super) fn on_failure(&mut self, mut task: Task) -> Result<(), SchedulerError> {
        let now = self.now_ms();
        let id = task.id;

        if task.retry_count < task.max_retries {
            task.retry_count += 1;
            task.status = TaskStatus::Pending;
            task.queued = false;
            task.push_log(now, format!("Retry attempt {}", task.retry_count));
            self.save(&task)?;

            let delay = self.retry_policy.delay_for(task.retry_count);
            let epoch = self.next_epoch();
            let timer = self.post_after(delay, Message::RetryDue { id, epoch });
            self.retries.schedule(id, epoch, timer);
            info!(
                task_id = %id,
                retry_count = task.retry_count,
                delay_secs = delay.as_secs(),
                "task failed, retry scheduled"
            );
        } else {
            task.finish(TaskStatus::Failed, now);
            task.error_message = Some(RETRIES_EXHAUSTED.into());
            task.push_log(now, "Task failed after maximum retries");
            self.save(&task)?;
            warn!(task_id = %id, retry_count = task.retry_count, "task failed after maximum retries");
        }
        Ok(())
    }

    /// Backoff elapsed: put the task back in the queue at its priority.
    ///
    /// A backend failure leaves the task backing off and the requeue is
    /// attempted again after [`BACKEND_RETRY_DELAY`].
    pub(super) fn on_retry_due(&mut self, id: TaskId, epoch: u64) -> Result<(), SchedulerError> {
        if !self.retries.take(&id, epoch) {
            debug!(task_id = %id, epoch, "ignoring stale retry timer");
            return Ok(());
        }
        if let Err(err) = self.requeue_after_backoff(id) {
            let epoch = self.next_epoch();
            let timer = self.post_after(BACKEND_RETRY_DELAY, Message::RetryDue { id, epoch });
            self.retries.schedule(id, epoch, timer);
            return Err(err);
        }
        Ok(())
    }

    fn requeue_after_backoff(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let Some(mut task) = self.store.get(&id)? else {
            return Ok(());
        };
        if task.status != TaskStatus::Pending {
            debug!(task_id = %id, status = ?task.status, "retry timer fired for non-pending task");
            return Ok(());
        }

        task.queued = true;
        task.push_log(self.now_ms(), "Requeued after retry delay");
        self.queue.enqueue(id, task.priority)?;
        if let Err(err) = self.save(&task) {
            self.queue.remove(&id)?;
            return Err(err);
        }
        self.wake = true;
        info!(task_id = %id, priority = %task.priority, "task requeued after retry delay");
        Ok(())
    }
}
