//! Runtime clock backed by tokio's timer.

use relay_core::{Clock, SystemClock, Timestamp};
use tokio::time::Instant;

/// Clock that reads the wall clock once and then advances with
/// `tokio::time::Instant`.
///
/// Under `#[tokio::test(start_paused = true)]` time only moves when the
/// runtime advances it, which makes packet deadlines deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    base: Timestamp,
}

impl TokioClock {
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            base: SystemClock.now(),
        }
    }

    /// Start the timeline at an explicit timestamp.
    pub fn starting_at(base: Timestamp) -> Self {
        Self {
            origin: Instant::now(),
            base,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.base.saturating_add(self.origin.elapsed())
    }
}
