//! Core scheduling: task model, backend seams and the scheduler actor.

pub mod backend;
pub mod cleanup;
mod engine;
pub mod error;
mod execution;
pub mod metrics;
pub mod recovery;
pub mod retry;
pub mod scheduler;
pub mod task;

pub use backend::{NotificationSink, PriorityQueue, TaskEvent, TaskStore};
pub use cleanup::is_expired;
pub use error::{AppResult, SchedulerError};
pub use metrics::TaskMetrics;
pub use recovery::{recover, RecoveryReport};
pub use retry::{RetryPolicy, RETRIES_EXHAUSTED};
pub use scheduler::TaskScheduler;
pub use task::{NewTask, Task, TaskLog, TaskStatus, TaskView};
