//! Time-based input debouncing.

use core::time::Duration;
use stepper_hal::Timestamp;

/// Accepts a new level only after it has been sampled continuously for the
/// debounce time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    stable: bool,
    candidate: Option<Timestamp>,
    debounce: Duration,
}

impl Debouncer {
    /// Start out accepting `initial`.
    #[must_use]
    pub fn new(initial: bool, debounce: Duration) -> Self {
        Self {
            stable: initial,
            candidate: None,
            debounce,
        }
    }

    /// Feed one sample. Returns the new level when an edge is accepted.
    pub fn update(&mut self, sample: bool, now: Timestamp) -> Option<bool> {
        if sample == self.stable {
            self.candidate = None;
            return None;
        }
        let since = *self.candidate.get_or_insert(now);
        if now.saturating_sub(since) < self.debounce {
            return None;
        }
        self.stable = sample;
        self.candidate = None;
        Some(sample)
    }

    /// Force the accepted level, e.g. on a read error.
    pub fn force(&mut self, level: bool) -> Option<bool> {
        self.candidate = None;
        if self.stable == level {
            return None;
        }
        self.stable = level;
        Some(level)
    }

    /// Accepted level.
    #[must_use]
    pub fn stable(&self) -> bool {
        self.stable
    }

    /// Whether a different level is currently being timed.
    #[must_use]
    pub fn is_settling(&self) -> bool {
        self.candidate.is_some()
    }
}
