//! Tests for builder modules

use std::sync::Arc;

use prometheus_task_scheduler::builders::{build_backends, SchedulerBuilder};
use prometheus_task_scheduler::config::{SchedulerConfig, StoreBackendConfig};
use prometheus_task_scheduler::core::{NewTask, PriorityQueue, SchedulerError, Task, TaskStatus, TaskStore};
use prometheus_task_scheduler::infra::{InMemorySink, InMemoryTaskStore};
use prometheus_task_scheduler::util::TaskId;

#[test]
fn test_in_memory_backends_start_empty() {
    let (store, queue) = build_backends(&StoreBackendConfig::InMemory).unwrap();
    assert!(store.ids().unwrap().is_empty());
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_file_backends_open_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (store, queue) = build_backends(&StoreBackendConfig::File {
        path: dir.path().join("state"),
    })
    .unwrap();
    assert!(store.ids().unwrap().is_empty());
    assert_eq!(queue.len().unwrap(), 0);
}

#[test]
fn test_builder_keeps_config() {
    let builder = SchedulerBuilder::new(SchedulerConfig {
        max_concurrent: 5,
        ..SchedulerConfig::default()
    });
    assert_eq!(builder.config().max_concurrent, 5);
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let err = SchedulerBuilder::new(SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    })
    .build()
    .unwrap_err();
    assert!(matches!(err, SchedulerError::Backend(msg) if msg.starts_with("config invalid")));
}

#[tokio::test]
async fn test_builder_rejects_cleanup_interval_that_would_overflow() {
    let err = SchedulerBuilder::new(SchedulerConfig {
        cleanup_interval_secs: u64::MAX,
        ..SchedulerConfig::default()
    })
    .build()
    .unwrap_err();
    assert!(matches!(err, SchedulerError::Backend(msg) if msg.contains("cleanup_interval_secs")));
}

#[tokio::test]
async fn test_builder_recovers_before_start() {
    let store = Arc::new(InMemoryTaskStore::new());
    let mut task = Task::new(
        TaskId::new(),
        NewTask::new("stuck", 600, false, Some(1)).unwrap(),
        3,
        0,
    );
    task.status = TaskStatus::Running;
    task.started_at = Some(0);
    store.put(&task).unwrap();
    store.index_add(&task.id).unwrap();

    let sink = Arc::new(InMemorySink::new());
    let (scheduler, report) = SchedulerBuilder::new(SchedulerConfig::default())
        .with_store(store.clone())
        .with_sink(sink.clone())
        .build_with_report()
        .unwrap();
    assert_eq!(report.requeued_running, 1);

    let restarted = scheduler.get(task.id).await.unwrap();
    assert_eq!(restarted.status, TaskStatus::Running);
    assert!(restarted
        .logs
        .iter()
        .any(|log| log.message == "Requeued after restart"));
    assert!(!sink.updates_for(&task.id).is_empty());
    scheduler.shutdown().await;
}
