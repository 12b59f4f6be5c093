//! Watchdog configuration and register timing.

use crate::error::{WatchdogError, WatchdogResult};
use core::time::Duration;
use stepper_hal::{WatchdogKind, WatchdogTiming};

/// IWDG reload register width.
pub const IWDG_RELOAD_MAX: u16 = 0x0FFF;

/// WWDG counter resets the MCU when bit 6 clears, i.e. below this value.
pub const WWDG_COUNTER_FLOOR: u8 = 0x3F;

/// Largest WWDG counter value.
pub const WWDG_COUNTER_MAX: u8 = 0x7F;

/// Watchdog manager configuration.
///
/// Created once at start-up and copied into the manager. Contains only
/// primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatchdogConfig {
    /// Peripheral to program.
    pub kind: WatchdogKind,

    /// Hardware timeout in milliseconds.
    ///
    /// Default: 100 ms.
    pub timeout_ms: u32,

    /// Interval between scheduled refreshes. Must be below the timeout.
    ///
    /// Default: 50 ms.
    pub refresh_interval_ms: u32,

    /// Time after a refresh during which another refresh counts as early.
    /// Must be below the refresh interval. Zero disables the window.
    pub window_open_ms: u32,

    /// Consecutive missed kicks before the manager starves the watchdog.
    ///
    /// Default: 3.
    pub max_missed_kicks: u32,

    /// LSI oscillator frequency clocking the IWDG.
    pub lsi_hz: u32,

    /// APB clock feeding the WWDG.
    pub pclk_hz: u32,
}

impl WatchdogConfig {
    /// Independent watchdog with the given timeout and a refresh at half of it.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout_ms` is outside 10..=5000.
    pub fn new(timeout_ms: u32) -> WatchdogResult<Self> {
        let config = Self {
            timeout_ms,
            refresh_interval_ms: timeout_ms / 2,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> WatchdogConfigBuilder {
        WatchdogConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or the timeout cannot be
    /// programmed into the selected peripheral.
    pub fn validate(&self) -> WatchdogResult<()> {
        if !(10..=5000).contains(&self.timeout_ms) {
            return Err(WatchdogError::invalid_configuration(
                "timeout_ms must be between 10 and 5000",
            ));
        }
        if self.refresh_interval_ms == 0 || self.refresh_interval_ms >= self.timeout_ms {
            return Err(WatchdogError::invalid_configuration(
                "refresh_interval_ms must be non-zero and below timeout_ms",
            ));
        }
        if self.window_open_ms >= self.refresh_interval_ms {
            return Err(WatchdogError::invalid_configuration(
                "window_open_ms must be below refresh_interval_ms",
            ));
        }
        if self.max_missed_kicks == 0 {
            return Err(WatchdogError::invalid_configuration(
                "max_missed_kicks must be at least 1",
            ));
        }
        if self.lsi_hz == 0 || self.pclk_hz == 0 {
            return Err(WatchdogError::invalid_configuration(
                "clock frequencies must be non-zero",
            ));
        }
        self.timing().map(|_| ())
    }

    /// Register programming for the configured peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::TimeoutUnreachable`] if no prescaler covers the
    /// timeout.
    pub fn timing(&self) -> WatchdogResult<WatchdogTiming> {
        match self.kind {
            WatchdogKind::Independent => iwdg_timing(self),
            WatchdogKind::Window => wwdg_timing(self),
        }
    }

    /// Timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    /// Refresh interval as a duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.refresh_interval_ms))
    }

    /// Early-refresh window as a duration.
    #[must_use]
    pub fn window_open(&self) -> Duration {
        Duration::from_millis(u64::from(self.window_open_ms))
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            kind: WatchdogKind::Independent,
            timeout_ms: 100,
            refresh_interval_ms: 50,
            window_open_ms: 0,
            max_missed_kicks: 3,
            lsi_hz: 32_000,
            pclk_hz: 120_000_000,
        }
    }
}

/// IWDG programming for `config`.
///
/// Picks the smallest prescaler (/4 through /256) whose 12-bit reload value
/// covers the timeout: `reload = timeout_ms * lsi_hz / (1000 * divider) - 1`.
///
/// # Errors
///
/// Returns [`WatchdogError::TimeoutUnreachable`] if even /256 overflows the
/// reload register, or the timeout is shorter than one LSI tick.
pub fn iwdg_timing(config: &WatchdogConfig) -> WatchdogResult<WatchdogTiming> {
    let unreachable = WatchdogError::TimeoutUnreachable {
        kind: "IWDG",
        timeout_ms: config.timeout_ms,
    };
    let lsi_hz = u64::from(config.lsi_hz);

    for prescaler_bits in 0u8..=6 {
        let divider = 4u64 << prescaler_bits;
        let ticks = u64::from(config.timeout_ms) * lsi_hz / (1000 * divider);
        if ticks == 0 {
            return Err(unreachable);
        }
        let Ok(reload) = u16::try_from(ticks - 1) else {
            continue;
        };
        if reload > IWDG_RELOAD_MAX {
            continue;
        }

        let window = if config.window_open_ms == 0 {
            IWDG_RELOAD_MAX
        } else {
            let closed = u64::from(config.window_open_ms) * lsi_hz / (1000 * divider);
            u16::try_from(u64::from(reload).saturating_sub(closed)).unwrap_or(0)
        };
        let timeout_us = (u64::from(reload) + 1) * divider * 1_000_000 / lsi_hz;

        return Ok(WatchdogTiming::Independent {
            prescaler_bits,
            prescaler_divider: u16::try_from(divider).unwrap_or(u16::MAX),
            reload,
            window,
            timeout_us: u32::try_from(timeout_us).unwrap_or(u32::MAX),
        });
    }
    Err(unreachable)
}

/// WWDG programming for `config`.
///
/// The counter ticks at `pclk / 4096 / 2^WDGTB` and resets the MCU when it
/// drops from 0x40 to 0x3F. Picks the smallest WDGTB (0 through 7) for which
/// the 64-count span covers the timeout.
///
/// # Errors
///
/// Returns [`WatchdogError::TimeoutUnreachable`] if even WDGTB = 7 is too fast.
pub fn wwdg_timing(config: &WatchdogConfig) -> WatchdogResult<WatchdogTiming> {
    let pclk_hz = u64::from(config.pclk_hz);
    let span = u64::from(WWDG_COUNTER_MAX - WWDG_COUNTER_FLOOR);

    for prescaler_bits in 0u8..=7 {
        // Clock cycles per counter tick.
        let cycles = 4096u64 << prescaler_bits;
        let counts = (u64::from(config.timeout_ms) * pclk_hz).div_ceil(cycles * 1000);
        if counts == 0 || counts > span {
            continue;
        }
        let closed = u64::from(config.window_open_ms) * pclk_hz / (cycles * 1000);

        let counter_wide = u64::from(WWDG_COUNTER_FLOOR) + counts;
        let window_wide = counter_wide
            .saturating_sub(closed)
            .max(u64::from(WWDG_COUNTER_FLOOR) + 1);
        let timeout_us = counts * cycles * 1_000_000 / pclk_hz;

        let (Ok(counter), Ok(window)) = (u8::try_from(counter_wide), u8::try_from(window_wide))
        else {
            continue;
        };
        return Ok(WatchdogTiming::Window {
            prescaler_bits,
            counter,
            window,
            timeout_us: u32::try_from(timeout_us).unwrap_or(u32::MAX),
        });
    }
    Err(WatchdogError::TimeoutUnreachable {
        kind: "WWDG",
        timeout_ms: config.timeout_ms,
    })
}

/// Builder for [`WatchdogConfig`].
#[derive(Debug, Default)]
pub struct WatchdogConfigBuilder {
    config: WatchdogConfig,
}

impl WatchdogConfigBuilder {
    /// Set the peripheral kind.
    #[must_use]
    pub fn kind(mut self, kind: WatchdogKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Set the timeout in milliseconds.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u32) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set the refresh interval in milliseconds.
    #[must_use]
    pub fn refresh_interval_ms(mut self, ms: u32) -> Self {
        self.config.refresh_interval_ms = ms;
        self
    }

    /// Set the early-refresh window in milliseconds.
    #[must_use]
    pub fn window_open_ms(mut self, ms: u32) -> Self {
        self.config.window_open_ms = ms;
        self
    }

    /// Set the missed-kick limit.
    #[must_use]
    pub fn max_missed_kicks(mut self, count: u32) -> Self {
        self.config.max_missed_kicks = count;
        self
    }

    /// Set the LSI frequency.
    #[must_use]
    pub fn lsi_hz(mut self, hz: u32) -> Self {
        self.config.lsi_hz = hz;
        self
    }

    /// Set the WWDG bus clock frequency.
    #[must_use]
    pub fn pclk_hz(mut self, hz: u32) -> Self {
        self.config.pclk_hz = hz;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> WatchdogResult<WatchdogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
