//! Watchdog manager state machine and metrics.
//!
//! The status lives in an atomic cell so the safety status publisher and
//! diagnostics can read it without locking the manager.

use crate::error::{WatchdogError, WatchdogResult};
use portable_atomic::{AtomicU32, Ordering};

/// Watchdog manager status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum WatchdogStatus {
    /// Peripheral not started.
    #[default]
    Stopped = 0,
    /// Refreshing on schedule.
    Running = 1,
    /// Too many missed kicks; refreshes withheld.
    Starved = 2,
    /// Time since the last refresh reached the hardware timeout.
    Expired = 3,
    /// Refreshes deliberately inhibited to force a hardware reset.
    Tripped = 4,
}

impl WatchdogStatus {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Running),
            2 => Some(Self::Starved),
            3 => Some(Self::Expired),
            4 => Some(Self::Tripped),
            _ => None,
        }
    }

    /// Convert to raw u32 value.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Whether the hardware is still being refreshed, or may be again.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Starved)
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Starved => "Starved",
            Self::Expired => "Expired",
            Self::Tripped => "Tripped",
        }
    }

    /// Whether the state machine permits `self -> to`.
    ///
    /// ```text
    /// Stopped ──start──► Running ──starve──► Starved
    ///                       ▲                   │
    ///                       └──────recover──────┤
    ///                                           │
    /// Running | Starved ──expire──► Expired ◄───┘
    /// any (except Tripped) ──trip──► Tripped
    /// any ──reset──► Stopped
    /// ```
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            (_, Self::Stopped) => true,
            (Self::Stopped, Self::Running)
            | (Self::Running, Self::Starved | Self::Expired)
            | (Self::Starved, Self::Running | Self::Expired) => true,
            (from, Self::Tripped) => from != Self::Tripped,
            _ => false,
        }
    }
}

impl core::fmt::Display for WatchdogStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic status cell with compare-exchange transitions.
#[derive(Debug)]
pub struct WatchdogState {
    status: AtomicU32,
}

impl WatchdogState {
    /// New state in `Stopped`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: AtomicU32::new(WatchdogStatus::Stopped.to_raw()),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        let raw = self.status.load(Ordering::Acquire);
        WatchdogStatus::from_raw(raw).unwrap_or(WatchdogStatus::Stopped)
    }

    fn transition(&self, from: WatchdogStatus, to: WatchdogStatus) -> WatchdogResult<()> {
        self.status
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| {
                let current = WatchdogStatus::from_raw(current).unwrap_or(WatchdogStatus::Stopped);
                WatchdogError::invalid_transition(current.as_str(), to.as_str())
            })
    }

    /// `Stopped -> Running`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Stopped`.
    pub fn start(&self) -> WatchdogResult<()> {
        self.transition(WatchdogStatus::Stopped, WatchdogStatus::Running)
    }

    /// `Running -> Starved`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Running`.
    pub fn starve(&self) -> WatchdogResult<()> {
        self.transition(WatchdogStatus::Running, WatchdogStatus::Starved)
    }

    /// `Starved -> Running`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current state is not `Starved`.
    pub fn recover(&self) -> WatchdogResult<()> {
        self.transition(WatchdogStatus::Starved, WatchdogStatus::Running)
    }

    /// `Running | Starved -> Expired`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog is not active.
    pub fn expire(&self) -> WatchdogResult<()> {
        self.transition(WatchdogStatus::Running, WatchdogStatus::Expired)
            .or_else(|_| self.transition(WatchdogStatus::Starved, WatchdogStatus::Expired))
    }

    /// `any -> Tripped`.
    ///
    /// # Errors
    ///
    /// Returns an error if already `Tripped`.
    pub fn trip(&self) -> WatchdogResult<()> {
        let previous = self
            .status
            .swap(WatchdogStatus::Tripped.to_raw(), Ordering::AcqRel);
        if previous == WatchdogStatus::Tripped.to_raw() {
            return Err(WatchdogError::invalid_transition("Tripped", "Tripped"));
        }
        Ok(())
    }

    /// `any -> Stopped`.
    pub fn reset(&self) {
        self.status
            .store(WatchdogStatus::Stopped.to_raw(), Ordering::Release);
    }
}

impl Default for WatchdogState {
    fn default() -> Self {
        Self::new()
    }
}

/// Refresh and supervision counters.
///
/// Every counter saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchdogMetrics {
    /// Hardware refreshes performed.
    pub refresh_count: u64,
    /// Missed kicks over the lifetime of the manager.
    pub missed_kicks: u64,
    /// Missed kicks since the last on-schedule refresh.
    pub consecutive_missed: u32,
    /// Refreshes refused because the window was still closed.
    pub early_refreshes: u64,
    /// Longest gap between two refreshes, in microseconds.
    pub max_refresh_interval_us: u64,
    /// Time of the last refresh, in microseconds since boot.
    pub last_refresh_us: u64,
    /// Times the watchdog was started.
    pub start_count: u32,
    /// Times the manager entered `Starved`.
    pub starvation_count: u32,
}

impl WatchdogMetrics {
    /// Zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hardware refresh at `timestamp_us`.
    pub fn record_refresh(&mut self, timestamp_us: u64) {
        if self.refresh_count > 0 {
            let interval = timestamp_us.saturating_sub(self.last_refresh_us);
            self.max_refresh_interval_us = self.max_refresh_interval_us.max(interval);
        }
        self.last_refresh_us = timestamp_us;
        self.refresh_count = self.refresh_count.saturating_add(1);
    }

    /// Record `count` missed kicks.
    pub fn record_missed(&mut self, count: u32) {
        self.missed_kicks = self.missed_kicks.saturating_add(u64::from(count));
        self.consecutive_missed = self.consecutive_missed.saturating_add(count);
    }

    /// Record an on-schedule kick.
    pub fn record_on_time(&mut self) {
        self.consecutive_missed = 0;
    }

    /// Record a refused early refresh.
    pub fn record_early(&mut self) {
        self.early_refreshes = self.early_refreshes.saturating_add(1);
    }

    /// Record a start.
    pub fn record_start(&mut self, timestamp_us: u64) {
        self.start_count = self.start_count.saturating_add(1);
        self.last_refresh_us = timestamp_us;
    }

    /// Record entry into `Starved`.
    pub fn record_starvation(&mut self) {
        self.starvation_count = self.starvation_count.saturating_add(1);
    }

    /// Reset all metrics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
