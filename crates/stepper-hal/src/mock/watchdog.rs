use super::clock::MockClock;
use crate::clock::{Clock, Timestamp};
use crate::error::{HalError, HalResult};
use crate::watchdog::{WatchdogKind, WatchdogPeripheral, WatchdogTiming};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct WatchdogInner {
    timing: Option<WatchdogTiming>,
    last_refresh: Timestamp,
    refreshes: u64,
    early_refreshes: u64,
    window_violated: bool,
    reset_flag: bool,
}

/// Watchdog that tracks refreshes against a [`MockClock`].
///
/// It never resets anything; tests ask [`MockWatchdog::expired`] whether real
/// hardware would have.
#[derive(Debug, Clone)]
pub struct MockWatchdog {
    kind: WatchdogKind,
    clock: MockClock,
    inner: Arc<Mutex<WatchdogInner>>,
}

impl MockWatchdog {
    /// Unstarted watchdog of the given kind.
    #[must_use]
    pub fn new(kind: WatchdogKind, clock: MockClock) -> Self {
        Self {
            kind,
            clock,
            inner: Arc::new(Mutex::new(WatchdogInner {
                timing: None,
                last_refresh: Duration::ZERO,
                refreshes: 0,
                early_refreshes: 0,
                window_violated: false,
                reset_flag: false,
            })),
        }
    }

    /// Pretend the last MCU reset came (or did not come) from this watchdog.
    pub fn set_reset_flag(&self, caused: bool) {
        self.inner.lock().reset_flag = caused;
    }

    /// Timing the watchdog was started with.
    #[must_use]
    pub fn timing(&self) -> Option<WatchdogTiming> {
        self.inner.lock().timing
    }

    /// Whether `start` has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.lock().timing.is_some()
    }

    /// Successful refreshes since start.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.inner.lock().refreshes
    }

    /// Refreshes that landed before the window opened.
    #[must_use]
    pub fn early_refresh_count(&self) -> u64 {
        self.inner.lock().early_refreshes
    }

    /// Time of the last refresh, or of start if none happened yet.
    #[must_use]
    pub fn last_refresh(&self) -> Timestamp {
        self.inner.lock().last_refresh
    }

    /// Whether real hardware would have reset the MCU by now.
    ///
    /// True when the time since the last refresh exceeds the programmed
    /// timeout, or when a window watchdog was refreshed early.
    #[must_use]
    pub fn expired(&self) -> bool {
        let inner = self.inner.lock();
        let Some(timing) = inner.timing else {
            return false;
        };
        if inner.window_violated {
            return true;
        }
        let elapsed = self.clock.now().saturating_sub(inner.last_refresh);
        elapsed > Duration::from_micros(u64::from(timing.timeout_us()))
    }

    fn window_open_after(timing: &WatchdogTiming) -> Option<Duration> {
        let timeout_us = u64::from(timing.timeout_us());
        match *timing {
            WatchdogTiming::Independent { reload, window, .. } => {
                if window >= reload {
                    return None;
                }
                let closed = u64::from(reload - window);
                Some(Duration::from_micros(
                    timeout_us.saturating_mul(closed) / u64::from(reload).saturating_add(1),
                ))
            }
            WatchdogTiming::Window { counter, window, .. } => {
                if window >= counter {
                    return None;
                }
                let span = u64::from(counter.saturating_sub(0x3F)).max(1);
                let closed = u64::from(counter - window);
                Some(Duration::from_micros(timeout_us.saturating_mul(closed) / span))
            }
        }
    }
}

impl WatchdogPeripheral for MockWatchdog {
    fn kind(&self) -> WatchdogKind {
        self.kind
    }

    fn start(&mut self, timing: &WatchdogTiming) -> HalResult<()> {
        if timing.kind() != self.kind {
            return Err(HalError::watchdog("timing does not match peripheral"));
        }
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.timing = Some(*timing);
        inner.last_refresh = now;
        inner.refreshes = 0;
        inner.early_refreshes = 0;
        inner.window_violated = false;
        Ok(())
    }

    fn refresh(&mut self) -> HalResult<()> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let Some(timing) = inner.timing else {
            return Err(HalError::NotInitialized);
        };
        if let Some(open_after) = Self::window_open_after(&timing) {
            if now.saturating_sub(inner.last_refresh) < open_after {
                inner.early_refreshes = inner.early_refreshes.saturating_add(1);
                inner.window_violated = true;
            }
        }
        inner.last_refresh = now;
        inner.refreshes = inner.refreshes.saturating_add(1);
        Ok(())
    }

    fn reset_caused_by_watchdog(&self) -> bool {
        self.inner.lock().reset_flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iwdg_100ms() -> WatchdogTiming {
        WatchdogTiming::Independent {
            prescaler_bits: 0,
            prescaler_divider: 4,
            reload: 799,
            window: 4095,
            timeout_us: 100_000,
        }
    }

    #[test]
    fn test_expiry_tracks_clock() {
        let clock = MockClock::new();
        let mut wdg = MockWatchdog::new(WatchdogKind::Independent, clock.clone());
        assert_eq!(wdg.refresh(), Err(HalError::NotInitialized));

        assert_eq!(wdg.start(&iwdg_100ms()), Ok(()));
        clock.advance_ms(60);
        assert_eq!(wdg.refresh(), Ok(()));
        clock.advance_ms(100);
        assert!(!wdg.expired());
        clock.advance_ms(1);
        assert!(wdg.expired());
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let mut wdg = MockWatchdog::new(WatchdogKind::Window, MockClock::new());
        assert!(matches!(
            wdg.start(&iwdg_100ms()),
            Err(HalError::Watchdog { .. })
        ));
    }

    #[test]
    fn test_window_early_refresh_detected() {
        let clock = MockClock::new();
        let mut wdg = MockWatchdog::new(WatchdogKind::Window, clock.clone());
        let timing = WatchdogTiming::Window {
            prescaler_bits: 7,
            counter: 0x7F,
            window: 0x5F,
            timeout_us: 64_000,
        };
        assert_eq!(wdg.start(&timing), Ok(()));
        clock.advance_ms(5);
        assert_eq!(wdg.refresh(), Ok(()));
        assert_eq!(wdg.early_refresh_count(), 1);
        assert!(wdg.expired());
    }
}
