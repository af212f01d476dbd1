//! Notification sinks.

pub mod broadcast;
pub mod fanout;
pub mod memory;

pub use broadcast::BroadcastSink;
pub use fanout::FanoutSink;
pub use memory::{InMemorySink, NoopSink, RecordedEvent};
