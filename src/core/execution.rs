//! Execution slot controller.
//!
//! A slot is held from the moment a task starts until its simulated
//! duration elapses or it is cancelled/deleted. Each held slot owns the
//! completion timer and the progress ticker of its task, so releasing the
//! slot cancels both.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use super::engine::{Engine, Message, BACKEND_RETRY_DELAY};
use crate::core::{SchedulerError, Task, TaskStatus};
use crate::runtime::timer::TimerHandle;
use crate::util::serde::TaskId;

/// Timers and bookkeeping for one occupied slot.
pub(crate) struct RunningSlot {
    pub(crate) epoch: u64,
    pub(crate) _completion: TimerHandle,
    pub(crate) _progress: TimerHandle,
}

/// Finite pool of `capacity` execution slots.
pub(crate) struct SlotController {
    capacity: usize,
    running: HashMap<TaskId, RunningSlot>,
}

impl SlotController {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            running: HashMap::with_capacity(capacity),
        }
    }

    /// Tasks currently holding a slot.
    pub(crate) fn in_flight(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.running.len() < self.capacity
    }

    /// Occupy a slot. Refused when full or when `id` already holds one.
    pub(crate) fn admit(&mut self, id: TaskId, slot: RunningSlot) -> bool {
        if !self.has_capacity() || self.running.contains_key(&id) {
            return false;
        }
        self.running.insert(id, slot);
        true
    }

    /// Free the slot held by `id`, cancelling its timers.
    pub(crate) fn release(&mut self, id: &TaskId) -> bool {
        self.running.remove(id).is_some()
    }

    /// Replace the completion timer of a held slot.
    pub(crate) fn rearm(&mut self, id: &TaskId, completion: TimerHandle) {
        if let Some(RunningSlot { epoch, _progress: progress, .. }) = self.running.remove(id) {
            let slot = RunningSlot {
                epoch,
                _completion: completion,
                _progress: progress,
            };
            self.running.insert(*id, slot);
        }
    }

    /// Whether `id` holds a slot started at `epoch`.
    pub(crate) fn holds(&self, id: &TaskId, epoch: u64) -> bool {
        self.running.get(id).is_some_and(|slot| slot.epoch == epoch)
    }
}

impl Engine {
    /// Occupy a slot and begin the simulated run.
    pub(super) fn start_execution(&mut self, mut task: Task) -> Result<(), SchedulerError> {
        let now = self.now_ms();
        let id = task.id;
        let epoch = self.next_epoch();

        let duration = Duration::from_secs(u64::from(task.duration));
        let completion = self.post_after(duration, Message::ExecutionDue { id, epoch });
        let progress = self.post_every(self.config.progress_interval(), move || {
            Message::ProgressTick { id, epoch }
        });
        let slot = RunningSlot {
            epoch,
            _completion: completion,
            _progress: progress,
        };
        if !self.slots.admit(id, slot) {
            self.queue.enqueue(id, task.priority)?;
            return Err(SchedulerError::Backend(format!(
                "no free execution slot for task {id}"
            )));
        }

        task.queued = false;
        task.status = TaskStatus::Running;
        task.started_at = Some(now);
        task.push_log(now, "Task started execution");
        if let Err(err) = self.save(&task) {
            self.slots.release(&id);
            self.queue.enqueue(id, task.priority)?;
            return Err(err);
        }
        info!(
            task_id = %id,
            priority = %task.priority,
            duration_secs = task.duration,
            in_flight = self.slots.in_flight(),
            "task started"
        );
        Ok(())
    }

    /// The simulated duration elapsed.
    ///
    /// The slot is held until the outcome is persisted. If that fails the
    /// completion is attempted again after [`BACKEND_RETRY_DELAY`].
    pub(super) fn on_execution_due(&mut self, id: TaskId, epoch: u64) -> Result<(), SchedulerError> {
        if !self.slots.holds(&id, epoch) {
            debug!(task_id = %id, epoch, "ignoring stale completion timer");
            return Ok(());
        }
        if let Err(err) = self.finish_execution(id) {
            let retry = self.post_after(BACKEND_RETRY_DELAY, Message::ExecutionDue { id, epoch });
            self.slots.rearm(&id, retry);
            return Err(err);
        }
        self.slots.release(&id);
        self.wake = true;
        Ok(())
    }

    fn finish_execution(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let Some(mut task) = self.store.get(&id)? else {
            return Ok(());
        };
        if task.status != TaskStatus::Running {
            return Ok(());
        }

        if task.should_fail {
            return self.on_failure(task);
        }
        let now = self.now_ms();
        task.finish(TaskStatus::Completed, now);
        task.push_log(now, "Task completed successfully");
        self.save(&task)?;
        info!(task_id = %id, "task completed");
        Ok(())
    }

    /// Broadcast progress for a running task.
    pub(super) fn on_progress_tick(&mut self, id: TaskId, epoch: u64) -> Result<(), SchedulerError> {
        if !self.slots.holds(&id, epoch) {
            return Ok(());
        }
        if let Some(task) = self.store.get(&id)? {
            if task.status == TaskStatus::Running {
                self.emit(&task);
            }
        }
        Ok(())
    }

    /// Stop a pending or running task for good.
    pub(super) fn cancel(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let Some(mut task) = self.store.get(&id)? else {
            debug!(task_id = %id, "cancel for unknown task ignored");
            return Ok(());
        };
        if task.is_terminal() {
            debug!(task_id = %id, status = ?task.status, "cancel for terminal task ignored");
            return Ok(());
        }

        let now = self.now_ms();
        task.finish(TaskStatus::Cancelled, now);
        task.push_log(now, "Task cancelled");
        self.save(&task)?;

        let was_running = self.slots.release(&id);
        self.retries.cancel(&id);
        self.wake = true;
        // A leftover entry for a cancelled task is skipped when it reaches the head.
        self.queue.remove(&id)?;
        info!(task_id = %id, was_running, "task cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::timer::schedule_after;

    fn slot(epoch: u64) -> RunningSlot {
        RunningSlot {
            epoch,
            _completion: schedule_after(Duration::from_secs(60), async {}),
            _progress: schedule_after(Duration::from_secs(60), async {}),
        }
    }

    #[tokio::test]
    async fn admission_respects_capacity() {
        let mut slots = SlotController::new(2);
        let (a, b, c) = (TaskId::new(), TaskId::new(), TaskId::new());

        assert!(slots.admit(a, slot(1)));
        assert!(!slots.admit(a, slot(2)));
        assert!(slots.admit(b, slot(3)));
        assert!(!slots.has_capacity());
        assert!(!slots.admit(c, slot(4)));
        assert_eq!(slots.in_flight(), 2);

        assert!(slots.holds(&a, 1));
        assert!(!slots.holds(&a, 2));
        assert!(slots.release(&a));
        assert!(!slots.release(&a));
        assert!(slots.admit(c, slot(5)));
    }

    #[tokio::test]
    async fn rearm_keeps_the_slot_and_its_epoch() {
        let mut slots = SlotController::new(1);
        let id = TaskId::new();
        assert!(slots.admit(id, slot(7)));

        slots.rearm(&id, schedule_after(Duration::from_secs(1), async {}));
        assert!(slots.holds(&id, 7));
        assert_eq!(slots.in_flight(), 1);

        // Unknown ids are left alone.
        slots.rearm(&TaskId::new(), schedule_after(Duration::from_secs(1), async {}));
        assert_eq!(slots.in_flight(), 1);
    }
}
