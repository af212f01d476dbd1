//! Cancellable scheduled events on the tokio runtime.
//!
//! Execution timeouts, progress ticks and retry backoff all go through this
//! one interface so each can be cancelled individually.

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Handle to a scheduled event. Dropping it cancels the event.
#[derive(Debug)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Cancel the event if it has not fired yet.
    pub fn cancel(self) {
        // Drop does the work.
    }

    /// Whether the event has fired or been cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Run `fut` once after `delay`.
///
/// Must be called from within a tokio runtime.
pub fn schedule_after<F>(delay: Duration, fut: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        fut.await;
    });
    TimerHandle {
        abort: handle.abort_handle(),
    }
}

/// Call `tick` every `period`, first after one full period.
///
/// `tick` returns `false` to stop the timer.
pub fn schedule_every<F>(period: Duration, mut tick: F) -> TimerHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            if !tick() {
                break;
            }
        }
    });
    TimerHandle {
        abort: handle.abort_handle(),
    }
}
