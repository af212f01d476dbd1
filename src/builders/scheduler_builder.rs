//! Builder that wires backends, runs recovery and starts the scheduler.

use std::sync::Arc;

use tracing::info;

use crate::config::{SchedulerConfig, StoreBackendConfig};
use crate::core::{recover, NotificationSink, PriorityQueue, RecoveryReport, SchedulerError, TaskScheduler, TaskStore};
use crate::infra::notify::{BroadcastSink, FanoutSink};
use crate::infra::queue::{FilePriorityQueue, InMemoryPriorityQueue};
use crate::infra::store::{FileTaskStore, InMemoryTaskStore};
use crate::util::clock::now_ms;

/// Store and queue selected by configuration.
pub type Backends = (Arc<dyn TaskStore>, Arc<dyn PriorityQueue>);

/// Open the store and queue named by `config.store`.
///
/// # Errors
///
/// Returns [`SchedulerError::Backend`] if a file backend cannot be opened.
pub fn build_backends(config: &StoreBackendConfig) -> Result<Backends, SchedulerError> {
    match config {
        StoreBackendConfig::InMemory => Ok((
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryPriorityQueue::new()),
        )),
        StoreBackendConfig::File { path } => Ok((
            Arc::new(FileTaskStore::open(path)?),
            Arc::new(FilePriorityQueue::open(path)?),
        )),
    }
}

/// Assembles a [`TaskScheduler`].
///
/// Backends not supplied explicitly come from the configuration. Events
/// always reach the scheduler's broadcast channel, plus the custom sink if
/// one is given.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    store: Option<Arc<dyn TaskStore>>,
    queue: Option<Arc<dyn PriorityQueue>>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl SchedulerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            store: None,
            queue: None,
            sink: None,
        }
    }

    /// Use this task store instead of the configured one.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this priority queue instead of the configured one.
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<dyn PriorityQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Also publish events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Configuration the scheduler will run with.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validate, recover and start. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a backend that cannot be opened, or a failure
    /// during recovery.
    pub fn build(self) -> Result<TaskScheduler, SchedulerError> {
        self.build_with_report().map(|(scheduler, _)| scheduler)
    }

    /// Like [`Self::build`], also returning what recovery changed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn build_with_report(self) -> Result<(TaskScheduler, RecoveryReport), SchedulerError> {
        self.config
            .validate()
            .map_err(|e| SchedulerError::Backend(format!("config invalid: {e}")))?;

        let (store, queue) = match (self.store, self.queue) {
            (Some(store), Some(queue)) => (store, queue),
            (store, queue) => {
                let (default_store, default_queue) = build_backends(&self.config.store)?;
                (store.unwrap_or(default_store), queue.unwrap_or(default_queue))
            }
        };

        let report = recover(store.as_ref(), queue.as_ref(), now_ms())?;

        let events = BroadcastSink::new(self.config.event_buffer);
        let mut fanout = FanoutSink::new().with(Arc::new(events.clone()));
        if let Some(sink) = self.sink {
            fanout = fanout.with(sink);
        }

        info!(store = ?self.config.store, ?report, "starting task scheduler");
        let scheduler = TaskScheduler::start(self.config, store, queue, Arc::new(fanout), events);
        Ok((scheduler, report))
    }
}
