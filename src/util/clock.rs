//! Time helpers.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Wall-clock milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Epoch-millisecond clock anchored to the tokio clock.
///
/// The wall time is sampled once at construction; later readings add the
/// elapsed tokio time. Timestamps therefore agree with timer deadlines, and
/// advance in virtual time when the tokio clock is paused.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_ms: u64,
    anchor: Instant,
}

impl Clock {
    /// Anchor a new clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor_ms: now_ms(),
            anchor: Instant::now(),
        }
    }

    /// Current time in epoch milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.anchor_ms.saturating_add(elapsed)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
