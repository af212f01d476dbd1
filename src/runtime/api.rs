//! API-facing request/response models.
//!
//! The transport itself lives outside this crate; these types pin down the
//! wire shapes and the validation a request body goes through before it
//! reaches the scheduler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::task::{INVALID_DURATION_MESSAGE, MAX_DURATION_SECS, MIN_DURATION_SECS};
use crate::core::{NewTask, SchedulerError};

/// Message returned to clients when the active task limit is hit.
pub const ACTIVE_LIMIT_MESSAGE: &str =
    "Active task limit reached. Please wait for running or queued tasks to finish.";

/// Task creation body: `{name, duration, shouldFail, priority?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Display name.
    pub name: String,
    /// Simulated duration in seconds.
    pub duration: u32,
    /// Whether every run fails.
    pub should_fail: bool,
    /// 1 (high), 2 (normal) or 3 (low).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl CreateTaskRequest {
    /// Validate into scheduler input.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Validation`] with a client-facing message.
    pub fn validate(&self) -> Result<NewTask, SchedulerError> {
        NewTask::new(&self.name, self.duration, self.should_fail, self.priority)
    }
}

/// Validate an untyped JSON body field by field.
///
/// Fields are checked in order name, duration, `shouldFail`, priority, each
/// for type as well as range. Whole numbers are accepted in either JSON
/// form (`5` or `5.0`), while `"5"` or `2.5` for the duration are rejected
/// with the duration message rather than a generic parse error.
///
/// # Errors
///
/// [`SchedulerError::Validation`] naming the first offending field.
pub fn parse_create_request(body: &Value) -> Result<NewTask, SchedulerError> {
    let Some(fields) = body.as_object() else {
        return Err(SchedulerError::Validation("Request body is required.".into()));
    };

    let name = NewTask::check_name(fields.get("name").and_then(Value::as_str).unwrap_or_default())?;

    let duration = fields
        .get("duration")
        .and_then(whole_number)
        .and_then(|d| u32::try_from(d).ok())
        .filter(|d| (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(d))
        .ok_or_else(|| SchedulerError::Validation(INVALID_DURATION_MESSAGE.into()))?;

    let should_fail = fields
        .get("shouldFail")
        .and_then(Value::as_bool)
        .ok_or_else(|| SchedulerError::Validation("shouldFail must be a boolean.".into()))?;

    let priority = match fields.get("priority") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            whole_number(raw)
                .and_then(|p| u8::try_from(p).ok())
                .ok_or_else(|| SchedulerError::Validation("Priority must be 1, 2, or 3.".into()))?,
        ),
    };

    NewTask::new(name, duration, should_fail, priority)
}

/// A non-negative JSON number with no fractional part, written `5` or `5.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]
fn whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(f))
            .map(|f| f as u64)
    })
}

/// Error payload for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: String,
}

impl From<&SchedulerError> for ErrorBody {
    fn from(err: &SchedulerError) -> Self {
        let error = match err {
            SchedulerError::Validation(msg) => msg.clone(),
            SchedulerError::ActiveTaskLimitReached { .. } => ACTIVE_LIMIT_MESSAGE.to_string(),
            SchedulerError::NotFound(_) => "Task not found.".to_string(),
            SchedulerError::Backend(_) | SchedulerError::ShuttingDown => {
                "Internal server error.".to_string()
            }
        };
        Self {
            error,
            code: err.code().to_string(),
        }
    }
}

/// HTTP status a transport should answer with for `err`.
#[must_use]
pub const fn status_code(err: &SchedulerError) -> u16 {
    match err {
        SchedulerError::Validation(_) => 400,
        SchedulerError::NotFound(_) => 404,
        SchedulerError::ActiveTaskLimitReached { .. } => 429,
        SchedulerError::Backend(_) => 500,
        SchedulerError::ShuttingDown => 503,
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
