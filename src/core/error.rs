//! Error types for scheduler operations.

use thiserror::Error;

use crate::util::serde::TaskId;

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Malformed input, rejected before any state mutation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Creating another task would exceed the active task limit.
    #[error("active task limit reached ({limit} pending or running)")]
    ActiveTaskLimitReached {
        /// Configured ceiling on pending + running tasks.
        limit: usize,
    },
    /// No task with this id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// The scheduler actor has stopped.
    #[error("scheduler is shutting down")]
    ShuttingDown,
}

impl SchedulerError {
    /// Stable machine-readable code for the excluded request layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ActiveTaskLimitReached { .. } => "ACTIVE_TASK_LIMIT_REACHED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::ShuttingDown => "SHUTTING_DOWN",
        }
    }

    /// Whether the caller, rather than the system, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ActiveTaskLimitReached { .. } | Self::NotFound(_)
        )
    }

    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
