//! Monotonic time source.

use core::time::Duration;

/// Time since boot.
///
/// Every timestamp in the safety core is a `Duration` measured from the same
/// monotonic origin, so subtraction is always `saturating_sub`.
pub type Timestamp = Duration;

/// A monotonic clock.
///
/// On target this is backed by a free-running timer (TIM2 at 1 MHz on the
/// reference board); on host by `MockClock`.
pub trait Clock {
    /// Current time since boot.
    fn now(&self) -> Timestamp;

    /// Microseconds since boot, saturating at `u64::MAX`.
    fn now_us(&self) -> u64 {
        u64::try_from(self.now().as_micros()).unwrap_or(u64::MAX)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
