//! Watchdog peripheral trait and register-level timing.

use crate::error::HalResult;
use core::fmt;

/// Which STM32 watchdog a peripheral drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WatchdogKind {
    /// IWDG, clocked from the LSI oscillator. Survives a core clock failure.
    #[default]
    Independent,
    /// WWDG, clocked from PCLK. Refreshes outside the window reset the MCU.
    Window,
}

impl fmt::Display for WatchdogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Independent => f.write_str("IWDG"),
            Self::Window => f.write_str("WWDG"),
        }
    }
}

/// Register values a watchdog peripheral is programmed with.
///
/// Computed once by the watchdog manager from its configuration, so the
/// peripheral implementation only copies fields into registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WatchdogTiming {
    /// IWDG programming.
    Independent {
        /// `IWDG_PR` value, 0 (/4) through 6 (/256).
        prescaler_bits: u8,
        /// Effective prescaler divider.
        prescaler_divider: u16,
        /// `IWDG_RLR`, at most 4095.
        reload: u16,
        /// `IWDG_WINR`. 4095 disables the window.
        window: u16,
        /// Resulting timeout in microseconds.
        timeout_us: u32,
    },
    /// WWDG programming.
    Window {
        /// `WWDG_CFR.WDGTB`, 0 through 7.
        prescaler_bits: u8,
        /// Counter reload, 0x40 through 0x7F.
        counter: u8,
        /// Window value. Refreshes while the counter is above it reset the MCU.
        window: u8,
        /// Resulting timeout in microseconds.
        timeout_us: u32,
    },
}

impl WatchdogTiming {
    /// Peripheral this timing is meant for.
    #[must_use]
    pub fn kind(&self) -> WatchdogKind {
        match self {
            Self::Independent { .. } => WatchdogKind::Independent,
            Self::Window { .. } => WatchdogKind::Window,
        }
    }

    /// Programmed timeout in microseconds.
    #[must_use]
    pub fn timeout_us(&self) -> u32 {
        match self {
            Self::Independent { timeout_us, .. } | Self::Window { timeout_us, .. } => *timeout_us,
        }
    }
}

/// A hardware watchdog.
///
/// Once started, the STM32 watchdogs cannot be stopped short of a reset.
/// There is deliberately no `stop`.
pub trait WatchdogPeripheral {
    /// Which watchdog this is.
    fn kind(&self) -> WatchdogKind;

    /// Program and start the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the timing does not match [`Self::kind`] or the
    /// peripheral rejected the values.
    fn start(&mut self, timing: &WatchdogTiming) -> HalResult<()>;

    /// Reload the counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog was not started.
    fn refresh(&mut self) -> HalResult<()>;

    /// Whether the last MCU reset was caused by this watchdog (RCC reset flags).
    fn reset_caused_by_watchdog(&self) -> bool;
}
