//! Configuration models for limits, timings and backends.

pub mod scheduler;

pub use scheduler::{
    SchedulerConfig, StoreBackendConfig, MAX_CLEANUP_INTERVAL_SECS, MAX_PROGRESS_INTERVAL_MS,
    MAX_RETENTION_HOURS,
};
