//! Tests for error types

use prometheus_task_scheduler::core::SchedulerError;
use prometheus_task_scheduler::util::TaskId;

#[test]
fn test_validation_error() {
    let err = SchedulerError::Validation("Priority must be 1, 2, or 3.".to_string());
    assert_eq!(format!("{err}"), "validation error: Priority must be 1, 2, or 3.");
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.is_client_error());
}

#[test]
fn test_active_limit_error() {
    let err = SchedulerError::ActiveTaskLimitReached { limit: 15 };
    assert_eq!(format!("{err}"), "active task limit reached (15 pending or running)");
    assert_eq!(err.code(), "ACTIVE_TASK_LIMIT_REACHED");
    assert!(err.is_client_error());
}

#[test]
fn test_not_found_error() {
    let id = TaskId::new();
    let err = SchedulerError::NotFound(id);
    assert_eq!(format!("{err}"), format!("task not found: {id}"));
    assert!(err.is_client_error());
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{err}"), "backend error: connection failed");
    assert_eq!(err.code(), "BACKEND_ERROR");
    assert!(!err.is_client_error());
}

#[test]
fn test_shutting_down_error() {
    let err = SchedulerError::ShuttingDown;
    assert_eq!(format!("{err}"), "scheduler is shutting down");
    assert!(!err.is_client_error());
}
