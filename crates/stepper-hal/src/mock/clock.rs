use crate::clock::{Clock, Timestamp};
use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Manually advanced monotonic clock.
///
/// Clones share the same time, so a test can keep one handle and move
/// another into the component under test.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    micros: Arc<AtomicU64>,
}

impl MockClock {
    /// Clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta_us = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);
        let _previous = self
            .micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |us| {
                Some(us.saturating_add(delta_us))
            });
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, at: Duration) {
        let at_us = u64::try_from(at.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_max(at_us, Ordering::AcqRel);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        Duration::from_micros(self.micros.load(Ordering::Acquire))
    }
}
