//! Tests for timers and the API models

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_task_scheduler::core::SchedulerError;
use prometheus_task_scheduler::runtime::api::{status_code, ACTIVE_LIMIT_MESSAGE};
use prometheus_task_scheduler::runtime::{
    health, parse_create_request, schedule_after, schedule_every, CreateTaskRequest, ErrorBody,
};
use prometheus_task_scheduler::util::{Priority, TaskId};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_timers_fire_independently() {
    let fired = Arc::new(AtomicUsize::new(0));
    let first = Arc::clone(&fired);
    let second = Arc::clone(&fired);

    let keep = schedule_after(Duration::from_secs(1), async move {
        first.fetch_add(1, Ordering::SeqCst);
    });
    let dropped = schedule_after(Duration::from_secs(1), async move {
        second.fetch_add(10, Ordering::SeqCst);
    });
    drop(dropped);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(keep.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_periodic_timer_stops_on_cancel() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let timer = schedule_every(Duration::from_millis(100), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    tokio::time::sleep(Duration::from_millis(350)).await;
    timer.cancel();
    let seen = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(seen, 3);
    assert_eq!(ticks.load(Ordering::SeqCst), seen);
}

#[test]
fn test_create_request_wire_names() {
    let req: CreateTaskRequest =
        serde_json::from_value(json!({ "name": "a", "duration": 3, "shouldFail": true })).unwrap();
    assert!(req.should_fail);
    assert_eq!(req.priority, None);
    let input = req.validate().unwrap();
    assert_eq!(input.priority, Priority::Normal);
}

#[test]
fn test_parse_create_request_errors() {
    let too_long = parse_create_request(&json!({
        "name": "sixteen chars!!!", "duration": 1, "shouldFail": false
    }))
    .unwrap_err();
    assert_eq!(
        too_long,
        SchedulerError::Validation("Name is required and must be 15 characters or fewer.".into())
    );

    let bad_priority = parse_create_request(&json!({
        "name": "a", "duration": 1, "shouldFail": false, "priority": 7
    }))
    .unwrap_err();
    assert_eq!(bad_priority, SchedulerError::Validation("Priority must be 1, 2, or 3.".into()));

    let out_of_range = parse_create_request(&json!({
        "name": "a", "duration": 601, "shouldFail": false
    }))
    .unwrap_err();
    assert!(matches!(out_of_range, SchedulerError::Validation(_)));

    assert!(parse_create_request(&json!("nope")).is_err());
}

#[test]
fn test_error_body_mapping() {
    let not_found = SchedulerError::NotFound(TaskId::new());
    assert_eq!(status_code(&not_found), 404);
    assert_eq!(ErrorBody::from(&not_found).code, "NOT_FOUND");

    let limit = SchedulerError::ActiveTaskLimitReached { limit: 2 };
    let body = ErrorBody::from(&limit);
    assert_eq!(body.error, ACTIVE_LIMIT_MESSAGE);
    assert_eq!(status_code(&limit), 429);
}

#[test]
fn test_health() {
    assert!(health().ok);
}
