//! # Prometheus Task Scheduler
//!
//! A priority task scheduler with bounded concurrency, retry with
//! exponential backoff, crash recovery and retention-based cleanup.
//!
//! Tasks are simulated units of work: each occupies an execution slot for a
//! fixed duration and then either completes or fails. Failed runs are
//! retried after `2^n` seconds until `max_retries` is exhausted.
//!
//! ## Core Problem Solved
//!
//! - **Bounded concurrency**: at most `max_concurrent` tasks run at once
//! - **Backpressure**: creation is refused once `max_active_tasks` are pending or running
//! - **Priority ordering**: high priority first, FIFO among equals
//! - **Restart safety**: tasks interrupted mid-run are requeued on the next start
//! - **Live observers**: every mutation is broadcast with a progress percentage
//!
//! ## Usage
//!
//! ```rust,ignore
//! use prometheus_task_scheduler::builders::SchedulerBuilder;
//! use prometheus_task_scheduler::config::SchedulerConfig;
//! use prometheus_task_scheduler::core::NewTask;
//!
//! let scheduler = SchedulerBuilder::new(SchedulerConfig::from_env()?).build()?;
//! let mut events = scheduler.subscribe();
//!
//! let task = scheduler.create(NewTask::new("report", 5, false, Some(1))?).await?;
//! scheduler.run(task.id).await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```
//!
//! All scheduling state is owned by one actor task, so the scheduler assumes
//! a single process per store.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: task model, backend seams and the scheduler actor.
pub mod core;
/// Configuration models for limits, timings and backends.
pub mod config;
/// Builders to construct the scheduler from configuration.
pub mod builders;
/// Infrastructure adapters for task storage, the priority queue and notifications.
pub mod infra;
/// Runtime adapters: cancellable timers and the API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
