//! Scheduler actor.
//!
//! The engine owns every piece of mutable scheduling state: the execution
//! slots, the pending retry timers and the handles to the store, queue and
//! sink. Commands from [`TaskScheduler`](crate::core::TaskScheduler) and
//! events from timers arrive on one channel and are handled strictly one at
//! a time, so the in-flight count and queue membership never race.
//!
//! Any handler that frees a slot or adds a queue member raises `wake`; the
//! loop then runs [`Engine::fill_slots`] once the handler returns.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::execution::SlotController;
use super::metrics::TaskMetrics;
use super::retry::{RetryPolicy, RetryTimers};
use crate::config::SchedulerConfig;
use crate::core::{
    NewTask, NotificationSink, PriorityQueue, SchedulerError, Task, TaskEvent, TaskStatus,
    TaskStore,
};
use crate::runtime::timer::{schedule_after, schedule_every, TimerHandle};
use crate::util::clock::Clock;
use crate::util::serde::TaskId;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SchedulerError>>;

/// Delay before a step that failed on a backend error is attempted again.
pub(crate) const BACKEND_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Everything the actor reacts to.
pub(crate) enum Message {
    Create { input: NewTask, reply: Reply<Task> },
    List { reply: Reply<Vec<Task>> },
    Get { id: TaskId, reply: Reply<Task> },
    Run { id: TaskId, reply: Reply<()> },
    Cancel { id: TaskId, reply: Reply<()> },
    Delete { id: TaskId, reply: Reply<()> },
    Metrics { reply: Reply<TaskMetrics> },
    Sweep { reply: Reply<usize> },
    Shutdown { reply: oneshot::Sender<()> },
    ExecutionDue { id: TaskId, epoch: u64 },
    ProgressTick { id: TaskId, epoch: u64 },
    RetryDue { id: TaskId, epoch: u64 },
    Wake,
}

pub(crate) struct Engine {
    pub(super) config: SchedulerConfig,
    pub(super) store: Arc<dyn TaskStore>,
    pub(super) queue: Arc<dyn PriorityQueue>,
    pub(super) sink: Arc<dyn NotificationSink>,
    pub(super) slots: SlotController,
    pub(super) retries: RetryTimers,
    pub(super) retry_policy: RetryPolicy,
    pub(super) wake: bool,
    clock: Clock,
    events: mpsc::WeakUnboundedSender<Message>,
    epoch: u64,
    fill_retry: Option<TimerHandle>,
}

impl Engine {
    pub(crate) fn new(
        config: SchedulerConfig,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn PriorityQueue>,
        sink: Arc<dyn NotificationSink>,
        events: mpsc::WeakUnboundedSender<Message>,
    ) -> Self {
        Self {
            slots: SlotController::new(config.max_concurrent),
            retries: RetryTimers::default(),
            retry_policy: RetryPolicy {
                base_secs: config.retry_base_secs,
            },
            config,
            store,
            queue,
            sink,
            wake: false,
            clock: Clock::new(),
            events,
            epoch: 0,
            fill_retry: None,
        }
    }

    /// Drive the actor until shutdown or until every handle is dropped.
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        info!(
            max_concurrent = self.config.max_concurrent,
            max_active_tasks = self.config.max_active_tasks,
            "scheduler started"
        );
        self.fill_slots();
        if let Err(err) = self.sweep_expired() {
            error!(error = %err, "startup cleanup sweep failed");
        }

        let mut cleanup = interval(self.config.cleanup_interval());
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick is immediate and the startup sweep already ran.
        cleanup.tick().await;

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if let Message::Shutdown { reply } = msg {
                        let _ = reply.send(());
                        break;
                    }
                    self.handle(msg);
                }
                _ = cleanup.tick() => {
                    if let Err(err) = self.sweep_expired() {
                        error!(error = %err, "cleanup sweep failed");
                    }
                }
            }
            if mem::take(&mut self.wake) {
                self.fill_slots();
            }
        }
        info!(in_flight = self.slots.in_flight(), "scheduler stopped");
    }

    fn handle(&mut self, msg: Message) {
        match msg {
            Message::Create { input, reply } => {
                let _ = reply.send(self.create(input));
            }
            Message::List { reply } => {
                let _ = reply.send(self.list());
            }
            Message::Get { id, reply } => {
                let _ = reply.send(self.get(&id));
            }
            Message::Run { id, reply } => {
                let _ = reply.send(self.run_task(id));
            }
            Message::Cancel { id, reply } => {
                let _ = reply.send(self.cancel(id));
            }
            Message::Delete { id, reply } => {
                let _ = reply.send(self.delete(&id));
            }
            Message::Metrics { reply } => {
                let _ = reply.send(self.metrics());
            }
            Message::Sweep { reply } => {
                let _ = reply.send(self.sweep_expired());
            }
            Message::Shutdown { reply } => {
                let _ = reply.send(());
            }
            Message::ExecutionDue { id, epoch } => {
                if let Err(err) = self.on_execution_due(id, epoch) {
                    error!(task_id = %id, error = %err, "completion handling failed");
                }
            }
            Message::ProgressTick { id, epoch } => {
                if let Err(err) = self.on_progress_tick(id, epoch) {
                    error!(task_id = %id, error = %err, "progress broadcast failed");
                }
            }
            Message::RetryDue { id, epoch } => {
                if let Err(err) = self.on_retry_due(id, epoch) {
                    error!(task_id = %id, error = %err, "retry requeue failed");
                }
            }
            Message::Wake => self.wake = true,
        }
    }

    fn create(&mut self, input: NewTask) -> Result<Task, SchedulerError> {
        let limit = self.config.max_active_tasks;
        let active = self
            .store
            .list_all()?
            .iter()
            .filter(|task| task.is_active())
            .count();
        if active >= limit {
            info!(active, limit, "task creation rejected at active task limit");
            return Err(SchedulerError::ActiveTaskLimitReached { limit });
        }

        let task = Task::new(TaskId::new(), input, self.config.max_retries, self.now_ms());
        self.store.put(&task)?;
        self.store.index_add(&task.id)?;
        self.emit(&task);
        info!(task_id = %task.id, name = %task.name, priority = %task.priority, "task created");
        Ok(task)
    }

    fn list(&self) -> Result<Vec<Task>, SchedulerError> {
        let mut tasks = self.store.list_all()?;
        tasks.sort_by_key(|task| task.created_at);
        Ok(tasks)
    }

    fn get(&self, id: &TaskId) -> Result<Task, SchedulerError> {
        self.store.get(id)?.ok_or(SchedulerError::NotFound(*id))
    }

    fn run_task(&mut self, id: TaskId) -> Result<(), SchedulerError> {
        let mut task = self.get(&id)?;
        if task.status != TaskStatus::Pending || task.queued || self.retries.is_pending(&id) {
            debug!(task_id = %id, status = ?task.status, queued = task.queued, "run request is a no-op");
            return Ok(());
        }

        task.queued = true;
        task.push_log(self.now_ms(), format!("Task added to queue with priority {}", task.priority));
        self.queue.enqueue(id, task.priority)?;
        if let Err(err) = self.save(&task) {
            self.queue.remove(&id)?;
            return Err(err);
        }
        self.wake = true;
        info!(task_id = %id, priority = %task.priority, "task enqueued");
        Ok(())
    }

    fn delete(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        if self.store.get(id)?.is_none() {
            return Err(SchedulerError::NotFound(*id));
        }
        let was_running = self.slots.release(id);
        self.remove_completely(id)?;
        self.wake = true;
        info!(task_id = %id, was_running, "task deleted");
        Ok(())
    }

    fn metrics(&self) -> Result<TaskMetrics, SchedulerError> {
        let tasks = self.store.list_all()?;
        Ok(TaskMetrics::from_tasks(&tasks).with_runtime(
            self.slots.in_flight(),
            self.queue.len()?,
            self.retries.len(),
        ))
    }

    /// Start queued tasks while slots remain.
    ///
    /// On a backend error the loop stops and is attempted again after
    /// [`BACKEND_RETRY_DELAY`].
    pub(super) fn fill_slots(&mut self) {
        while self.slots.has_capacity() {
            match self.start_next() {
                Ok(true) => {}
                Ok(false) => return,
                Err(err) => {
                    error!(error = %err, "failed to start next queued task");
                    let armed = self.fill_retry.as_ref().is_some_and(|timer| !timer.is_finished());
                    if !armed {
                        self.fill_retry = Some(self.post_after(BACKEND_RETRY_DELAY, Message::Wake));
                    }
                    return;
                }
            }
        }
    }

    /// Move the head of the queue into a slot. `Ok(false)` once it is empty.
    ///
    /// The head is only removed once its record has loaded, so a failed read
    /// leaves it queued. Entries whose task vanished or is no longer pending
    /// are dropped without consuming a slot.
    fn start_next(&mut self) -> Result<bool, SchedulerError> {
        let Some(id) = self.queue.peek_min()? else {
            return Ok(false);
        };
        let task = self.store.get(&id)?;
        self.queue.remove(&id)?;
        match task {
            Some(task) if task.status == TaskStatus::Pending => self.start_execution(task)?,
            Some(task) => {
                debug!(task_id = %id, status = ?task.status, "skipping queue entry for non-pending task");
            }
            None => debug!(task_id = %id, "skipping queue entry for deleted task"),
        }
        Ok(true)
    }

    pub(super) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(super) fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Persist a task and broadcast the new state.
    pub(super) fn save(&self, task: &Task) -> Result<(), SchedulerError> {
        self.store.put(task)?;
        self.emit(task);
        Ok(())
    }

    pub(super) fn emit(&self, task: &Task) {
        self.sink.publish(TaskEvent::Updated(task.view(self.now_ms())));
    }

    /// Post `msg` back to this actor after `delay`.
    pub(super) fn post_after(&self, delay: Duration, msg: Message) -> TimerHandle {
        let events = self.events.clone();
        schedule_after(delay, async move {
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(msg);
            }
        })
    }

    /// Post a fresh message every `period` until the actor goes away.
    pub(super) fn post_every<F>(&self, period: Duration, make: F) -> TimerHandle
    where
        F: Fn() -> Message + Send + 'static,
    {
        let events = self.events.clone();
        schedule_every(period, move || {
            events
                .upgrade()
                .is_some_and(|tx| tx.send(make()).is_ok())
        })
    }
}
