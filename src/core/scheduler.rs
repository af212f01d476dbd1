//! Public handle to the scheduler actor.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use super::engine::{Engine, Message, Reply};
use super::metrics::TaskMetrics;
use crate::config::SchedulerConfig;
use crate::core::{NewTask, NotificationSink, PriorityQueue, SchedulerError, Task, TaskEvent, TaskStore};
use crate::infra::notify::BroadcastSink;
use crate::util::serde::TaskId;

/// Cheaply cloneable handle for submitting commands to a running scheduler.
///
/// Every call is processed by the single scheduler actor in arrival order.
/// Once [`TaskScheduler::shutdown`] has run, or the actor has stopped for any
/// other reason, calls fail with [`SchedulerError::ShuttingDown`].
#[derive(Clone)]
pub struct TaskScheduler {
    tx: mpsc::UnboundedSender<Message>,
    events: BroadcastSink,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TaskScheduler {
    /// Spawn the actor over ready backends. Recovery must already have run.
    pub(crate) fn start(
        config: SchedulerConfig,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn PriorityQueue>,
        sink: Arc<dyn NotificationSink>,
        events: BroadcastSink,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(config, store, queue, sink, tx.downgrade());
        let join = tokio::spawn(engine.run(rx));
        Self {
            tx,
            events,
            join: Arc::new(Mutex::new(Some(join))),
        }
    }

    /// Persist a new pending task from already validated input.
    ///
    /// The task is not queued until [`TaskScheduler::run`] is called.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ActiveTaskLimitReached`] once pending plus running
    /// tasks reach the configured limit, or a backend failure.
    pub async fn create(&self, input: NewTask) -> Result<Task, SchedulerError> {
        self.request(|reply| Message::Create { input, reply }).await
    }

    /// All tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Backend failure or shutdown.
    pub async fn list(&self) -> Result<Vec<Task>, SchedulerError> {
        self.request(|reply| Message::List { reply }).await
    }

    /// Fetch one task.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotFound`] for an unknown id.
    pub async fn get(&self, id: TaskId) -> Result<Task, SchedulerError> {
        self.request(|reply| Message::Get { id, reply }).await
    }

    /// Put a pending task in the priority queue.
    ///
    /// A no-op for tasks that are running, terminal, already queued or
    /// waiting out a retry backoff.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotFound`] for an unknown id.
    pub async fn run(&self, id: TaskId) -> Result<(), SchedulerError> {
        self.request(|reply| Message::Run { id, reply }).await
    }

    /// Cancel a pending or running task, freeing its slot at once.
    ///
    /// Unknown ids and terminal tasks are ignored.
    ///
    /// # Errors
    ///
    /// Backend failure or shutdown.
    pub async fn cancel(&self, id: TaskId) -> Result<(), SchedulerError> {
        self.request(|reply| Message::Cancel { id, reply }).await
    }

    /// Remove a task entirely.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotFound`] for an unknown id.
    pub async fn delete(&self, id: TaskId) -> Result<(), SchedulerError> {
        self.request(|reply| Message::Delete { id, reply }).await
    }

    /// Current counts across all tasks.
    ///
    /// # Errors
    ///
    /// Backend failure or shutdown.
    pub async fn metrics(&self) -> Result<TaskMetrics, SchedulerError> {
        self.request(|reply| Message::Metrics { reply }).await
    }

    /// Run a cleanup pass now; returns how many tasks were removed.
    ///
    /// # Errors
    ///
    /// Backend failure or shutdown.
    pub async fn sweep_now(&self) -> Result<usize, SchedulerError> {
        self.request(|reply| Message::Sweep { reply }).await
    }

    /// Receive every task update and deletion from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Stop the actor and wait for it to exit.
    ///
    /// Pending timers are dropped with the actor. Persisted tasks stay as
    /// they are; running ones are requeued by recovery on the next start.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Message::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
        let join = self.join.lock().take();
        if let Some(join) = join {
            if let Err(err) = join.await {
                warn!(error = %err, "scheduler actor ended abnormally");
            }
        }
    }

    /// Whether the actor is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn request<T, F>(&self, build: F) -> Result<T, SchedulerError>
    where
        F: FnOnce(Reply<T>) -> Message,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| SchedulerError::ShuttingDown)?;
        rx.await.map_err(|_| SchedulerError::ShuttingDown)?
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("running", &self.is_running())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
