//! Runtime adapters: cancellable timers and the API surface.

pub mod api;
pub mod timer;

pub use api::{health, parse_create_request, CreateTaskRequest, ErrorBody, Health};
pub use timer::{schedule_after, schedule_every, TimerHandle};
