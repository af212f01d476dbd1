//! Infrastructure adapters for task storage, the priority queue and notifications.

pub mod notify;
pub mod queue;
pub mod store;

pub use notify::{BroadcastSink, FanoutSink, InMemorySink, NoopSink};
pub use queue::{FilePriorityQueue, InMemoryPriorityQueue};
pub use store::{FileTaskStore, InMemoryTaskStore};
