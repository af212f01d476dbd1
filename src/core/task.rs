//! Task record, lifecycle states and creation input.

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{Priority, TaskId};

/// Longest accepted task name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 15;
/// Shortest accepted simulated duration in seconds.
pub const MIN_DURATION_SECS: u32 = 1;
/// Longest accepted simulated duration in seconds.
pub const MAX_DURATION_SECS: u32 = 600;

/// Client-facing message for a rejected name.
pub const INVALID_NAME_MESSAGE: &str = "Name is required and must be 15 characters or fewer.";
/// Client-facing message for a rejected duration.
pub const INVALID_DURATION_MESSAGE: &str =
    "Duration must be an integer between 1 and 600 seconds.";

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created or waiting for a slot (possibly queued, possibly backing off).
    Pending,
    /// Occupying an execution slot.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed after exhausting retries.
    Failed,
    /// Cancelled by request.
    Cancelled,
}

impl TaskStatus {
    /// Terminal states admit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Pending and running tasks count against the active task limit.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// One lifecycle log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    /// Epoch milliseconds.
    pub timestamp: u64,
    /// Human-readable event.
    pub message: String,
}

/// Validated input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Trimmed display name.
    pub name: String,
    /// Seconds the simulated execution occupies a slot.
    pub duration_secs: u32,
    /// Whether every simulated run ends in failure.
    pub should_fail: bool,
    /// Queue priority.
    pub priority: Priority,
}

impl NewTask {
    /// Validate raw creation input.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Validation`] for an empty or overlong name,
    /// an out-of-range duration or a priority outside `{1, 2, 3}`.
    pub fn new(
        name: &str,
        duration_secs: u32,
        should_fail: bool,
        priority: Option<u8>,
    ) -> Result<Self, SchedulerError> {
        let name = Self::check_name(name)?;
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration_secs) {
            return Err(SchedulerError::Validation(INVALID_DURATION_MESSAGE.into()));
        }
        let priority = priority.map_or(Ok(Priority::default()), Priority::try_from)?;
        Ok(Self {
            name: name.to_string(),
            duration_secs,
            should_fail,
            priority,
        })
    }

    /// Trim `name` and check it is non-empty and at most [`MAX_NAME_LEN`] characters.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Validation`] with [`INVALID_NAME_MESSAGE`].
    pub fn check_name(name: &str) -> Result<&str, SchedulerError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(SchedulerError::Validation(INVALID_NAME_MESSAGE.into()));
        }
        Ok(name)
    }
}

/// The unit of schedulable, simulated work.
///
/// Invariants maintained by the scheduler:
/// - `queued` implies `status == Pending`
/// - `retry_count <= max_retries`
/// - `finished_at` is set exactly when the status is terminal
/// - `logs` only grows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Display name.
    pub name: String,
    /// Creation time, epoch milliseconds.
    pub created_at: u64,
    /// Seconds the simulated execution occupies a slot.
    pub duration: u32,
    /// Whether the simulated run ends in failure.
    pub should_fail: bool,
    /// Queue priority.
    pub priority: Priority,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Member of the priority queue.
    #[serde(default)]
    pub queued: bool,
    /// Failed runs so far.
    pub retry_count: u32,
    /// Failed runs tolerated before the task fails for good.
    pub max_retries: u32,
    /// When the current or last run began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// When the task reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
    /// Reason for terminal failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Append-only lifecycle log.
    #[serde(default)]
    pub logs: Vec<TaskLog>,
}

impl Task {
    /// Build a fresh pending task that is not yet queued.
    #[must_use]
    pub fn new(id: TaskId, input: NewTask, max_retries: u32, now_ms: u64) -> Self {
        Self {
            id,
            name: input.name,
            created_at: now_ms,
            duration: input.duration_secs,
            should_fail: input.should_fail,
            priority: input.priority,
            status: TaskStatus::Pending,
            queued: false,
            retry_count: 0,
            max_retries,
            started_at: None,
            finished_at: None,
            error_message: None,
            logs: vec![TaskLog {
                timestamp: now_ms,
                message: "Task created".into(),
            }],
        }
    }

    /// Append a log entry.
    pub fn push_log(&mut self, now_ms: u64, message: impl Into<String>) {
        self.logs.push(TaskLog {
            timestamp: now_ms,
            message: message.into(),
        });
    }

    /// Pending or running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Completed, failed or cancelled.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a terminal state, stamping `finished_at` and dropping queue membership.
    pub fn finish(&mut self, status: TaskStatus, now_ms: u64) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.queued = false;
        self.finished_at = Some(now_ms);
    }

    /// Timestamp the retention window is measured from.
    #[must_use]
    pub fn terminal_timestamp(&self) -> u64 {
        self.finished_at.unwrap_or(self.created_at)
    }

    /// Percentage of the simulated run that has elapsed.
    ///
    /// Terminal tasks report 100, running tasks report elapsed time over
    /// duration (capped at 100), everything else reports 0.
    #[must_use]
    pub fn progress(&self, now_ms: u64) -> u8 {
        if self.is_terminal() {
            return 100;
        }
        match (self.status, self.started_at) {
            (TaskStatus::Running, Some(started)) => {
                let elapsed = now_ms.saturating_sub(started);
                let total = u64::from(self.duration.max(1)) * 1000;
                let pct = (elapsed.saturating_mul(100) / total).min(100);
                u8::try_from(pct).unwrap_or(100)
            }
            _ => 0,
        }
    }

    /// Snapshot augmented with progress, as broadcast to observers.
    #[must_use]
    pub fn view(&self, now_ms: u64) -> TaskView {
        TaskView {
            task: self.clone(),
            progress: self.progress(now_ms),
        }
    }
}

/// Task record plus computed progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    /// Full task record.
    #[serde(flatten)]
    pub task: Task,
    /// Percentage 0..=100.
    pub progress: u8,
}
