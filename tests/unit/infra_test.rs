//! Tests for store, queue and notification backends

use std::sync::Arc;

use prometheus_task_scheduler::core::{
    NewTask, NotificationSink, PriorityQueue, Task, TaskEvent, TaskStatus, TaskStore,
};
use prometheus_task_scheduler::infra::{
    BroadcastSink, FanoutSink, FilePriorityQueue, FileTaskStore, InMemoryPriorityQueue,
    InMemorySink, InMemoryTaskStore,
};
use prometheus_task_scheduler::util::{Priority, TaskId};

fn sample(name: &str, priority: u8) -> Task {
    Task::new(
        TaskId::new(),
        NewTask::new(name, 3, false, Some(priority)).unwrap(),
        3,
        1_000,
    )
}

fn exercise_store(store: &dyn TaskStore) {
    let mut task = sample("stored", 2);
    store.put(&task).unwrap();
    store.index_add(&task.id).unwrap();
    assert_eq!(store.get(&task.id).unwrap(), Some(task.clone()));

    task.status = TaskStatus::Running;
    store.put(&task).unwrap();
    assert_eq!(store.get(&task.id).unwrap().unwrap().status, TaskStatus::Running);
    assert_eq!(store.list_all().unwrap().len(), 1);

    store.remove(&task.id).unwrap();
    assert_eq!(store.get(&task.id).unwrap(), None);
    assert!(store.list_all().unwrap().is_empty(), "dangling ids are skipped");
    store.index_remove(&task.id).unwrap();
    assert!(store.ids().unwrap().is_empty());
    store.remove(&task.id).unwrap();
}

fn exercise_queue(queue: &dyn PriorityQueue) {
    assert_eq!(queue.pop_min().unwrap(), None);
    let (low, normal_a, high, normal_b) = (TaskId::new(), TaskId::new(), TaskId::new(), TaskId::new());
    queue.enqueue(low, Priority::Low).unwrap();
    queue.enqueue(normal_a, Priority::Normal).unwrap();
    queue.enqueue(high, Priority::High).unwrap();
    queue.enqueue(normal_b, Priority::Normal).unwrap();
    queue.enqueue(normal_a, Priority::Normal).unwrap();
    assert_eq!(queue.len().unwrap(), 4);
    assert_eq!(queue.score_of(&low).unwrap(), Some(Priority::Low));

    assert!(queue.remove(&low).unwrap());
    assert!(!queue.remove(&low).unwrap());
    assert_eq!(queue.pop_min().unwrap(), Some(high));
    assert_eq!(queue.pop_min().unwrap(), Some(normal_a));
    assert_eq!(queue.pop_min().unwrap(), Some(normal_b));
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_in_memory_store() {
    exercise_store(&InMemoryTaskStore::new());
}

#[test]
fn test_file_store() {
    let dir = tempfile::tempdir().unwrap();
    exercise_store(&FileTaskStore::open(dir.path()).unwrap());
}

#[test]
fn test_in_memory_queue() {
    exercise_queue(&InMemoryPriorityQueue::new());
}

#[test]
fn test_file_queue() {
    let dir = tempfile::tempdir().unwrap();
    exercise_queue(&FilePriorityQueue::open(dir.path()).unwrap());
}

#[test]
fn test_file_backends_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let task = sample("durable", 1);
    let other = TaskId::new();
    {
        let store = FileTaskStore::open(dir.path()).unwrap();
        let queue = FilePriorityQueue::open(dir.path()).unwrap();
        store.put(&task).unwrap();
        store.index_add(&task.id).unwrap();
        queue.enqueue(other, Priority::Normal).unwrap();
        queue.enqueue(task.id, Priority::Normal).unwrap();
    }
    let store = FileTaskStore::open(dir.path()).unwrap();
    let queue = FilePriorityQueue::open(dir.path()).unwrap();
    assert_eq!(store.get(&task.id).unwrap(), Some(task.clone()));
    assert_eq!(queue.pop_min().unwrap(), Some(other));
    assert_eq!(queue.pop_min().unwrap(), Some(task.id));
}

#[tokio::test]
async fn test_broadcast_sink_delivers_to_subscribers() {
    let sink = BroadcastSink::new(8);
    let mut rx = sink.subscribe();
    assert_eq!(sink.receiver_count(), 1);

    let id = TaskId::new();
    sink.publish(TaskEvent::Deleted { id });
    assert_eq!(rx.recv().await.unwrap(), TaskEvent::Deleted { id });
}

#[test]
fn test_broadcast_sink_without_subscribers_is_silent() {
    BroadcastSink::new(1).publish(TaskEvent::Deleted { id: TaskId::new() });
}

#[test]
fn test_event_wire_format() {
    let task = sample("wire", 3);
    let json = serde_json::to_value(TaskEvent::Updated(task.view(1_000))).unwrap();
    assert_eq!(json["event"], "task:update");
    assert_eq!(json["data"]["id"], task.id.to_string());
    assert_eq!(json["data"]["priority"], 3);
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["progress"], 0);
    assert_eq!(json["data"]["shouldFail"], false);

    let json = serde_json::to_value(TaskEvent::Deleted { id: task.id }).unwrap();
    assert_eq!(json["event"], "task:delete");
    assert_eq!(json["data"]["id"], task.id.to_string());
}

#[test]
fn test_fanout_and_recording_sinks() {
    let recorder = Arc::new(InMemorySink::new());
    let fanout = FanoutSink::new().with(recorder.clone());
    let task = sample("seen", 2);
    fanout.publish(TaskEvent::Updated(task.view(0)));
    fanout.publish(TaskEvent::Deleted { id: task.id });

    assert_eq!(recorder.updates_for(&task.id).len(), 1);
    assert_eq!(recorder.deletions(), vec![task.id]);
    recorder.clear();
    assert!(recorder.events().is_empty());
}
