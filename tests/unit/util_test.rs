//! Tests for utility functions

use prometheus_task_scheduler::core::SchedulerError;
use prometheus_task_scheduler::util::{Clock, Priority, TaskId};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High < Priority::Normal);
    assert!(Priority::Normal < Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_priority_wire_format() {
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "1");
    let parsed: Priority = serde_json::from_str("3").unwrap();
    assert_eq!(parsed, Priority::Low);
    assert!(serde_json::from_str::<Priority>("4").is_err());
    assert_eq!(
        Priority::try_from(0_u8),
        Err(SchedulerError::Validation("Priority must be 1, 2, or 3.".into()))
    );
}

#[test]
fn test_task_id_parse() {
    let id = TaskId::new();
    assert_eq!(TaskId::parse(&id.to_string()).unwrap(), id);
    assert_eq!(
        TaskId::parse("12345"),
        Err(SchedulerError::Validation("Invalid task id.".into()))
    );
}

#[test]
fn test_task_ids_are_unique() {
    assert_ne!(TaskId::new(), TaskId::new());
}

#[tokio::test(start_paused = true)]
async fn test_clock_is_monotonic_under_paused_time() {
    let clock = Clock::new();
    let first = clock.now_ms();
    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    assert_eq!(clock.now_ms(), first + 2_000);
}
