//! Refresh scheduling and missed-kick supervision.

use crate::config::WatchdogConfig;
use crate::error::{WatchdogError, WatchdogResult};
use crate::state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
use core::time::Duration;
use stepper_hal::{Timestamp, WatchdogPeripheral, WatchdogTiming};

/// Outcome of one [`WatchdogManager::service`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WatchdogTick {
    /// No refresh was due.
    Idle,
    /// The hardware was refreshed on schedule.
    Refreshed,
    /// A refresh was requested before the window opened and was skipped.
    Deferred,
    /// The hardware was refreshed, but kicks were missed.
    Missed {
        /// Missed kicks in a row.
        consecutive: u32,
    },
    /// The missed-kick limit was reached; refreshes are withheld.
    Starved {
        /// Missed kicks in a row.
        consecutive: u32,
    },
    /// The hardware timeout elapsed without a refresh.
    Expired,
    /// Refreshes are inhibited.
    Inhibited,
}

fn as_us(at: Timestamp) -> u64 {
    u64::try_from(at.as_micros()).unwrap_or(u64::MAX)
}

/// Schedules hardware refreshes and supervises application liveness.
///
/// The application proves it is alive by calling [`kick`](Self::kick) once
/// per main-loop iteration. [`service`](Self::service) refreshes the
/// peripheral at every refresh slot, counting a missed kick for each slot
/// with no kick since the previous one. After `max_missed_kicks` misses in a
/// row the manager stops refreshing and lets the hardware reset the MCU,
/// unless a kick arrives first; the next `service` then refreshes at once.
#[derive(Debug)]
pub struct WatchdogManager<W: WatchdogPeripheral> {
    peripheral: W,
    config: WatchdogConfig,
    timing: Option<WatchdogTiming>,
    state: WatchdogState,
    metrics: WatchdogMetrics,
    next_due: Timestamp,
    last_refresh: Timestamp,
    kicked: bool,
    reset_by_watchdog: bool,
}

impl<W: WatchdogPeripheral> WatchdogManager<W> {
    /// Create a manager. The peripheral is not started yet.
    ///
    /// The reset cause is latched here, before anything can clear the
    /// hardware flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or does not match the
    /// peripheral kind.
    pub fn new(peripheral: W, config: WatchdogConfig) -> WatchdogResult<Self> {
        config.validate()?;
        if config.kind != peripheral.kind() {
            return Err(WatchdogError::invalid_configuration(
                "configured kind does not match the peripheral",
            ));
        }
        let reset_by_watchdog = peripheral.reset_caused_by_watchdog();
        if reset_by_watchdog {
            tracing::warn!(kind = %config.kind, "last reset was caused by the watchdog");
        }
        Ok(Self {
            peripheral,
            config,
            timing: None,
            state: WatchdogState::new(),
            metrics: WatchdogMetrics::new(),
            next_due: Duration::ZERO,
            last_refresh: Duration::ZERO,
            kicked: false,
            reset_by_watchdog,
        })
    }

    /// Program and start the peripheral.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is not stopped or the peripheral
    /// rejects the timing.
    pub fn start(&mut self, now: Timestamp) -> WatchdogResult<()> {
        let timing = self.config.timing()?;
        self.state.start()?;
        if let Err(err) = self.peripheral.start(&timing) {
            self.state.reset();
            return Err(err.into());
        }
        self.timing = Some(timing);
        self.last_refresh = now;
        self.next_due = now.saturating_add(self.config.refresh_interval());
        self.kicked = true;
        self.metrics.record_start(as_us(now));
        tracing::info!(
            kind = %self.config.kind,
            timeout_us = timing.timeout_us(),
            refresh_ms = self.config.refresh_interval_ms,
            "watchdog started"
        );
        Ok(())
    }

    /// Liveness check-in from the main loop.
    pub fn kick(&mut self) {
        self.kicked = true;
    }

    /// Run the refresh scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::NotRunning`] before [`start`](Self::start), or
    /// a HAL error if the refresh itself fails.
    pub fn service(&mut self, now: Timestamp) -> WatchdogResult<WatchdogTick> {
        match self.state.status() {
            WatchdogStatus::Stopped => return Err(WatchdogError::NotRunning),
            WatchdogStatus::Tripped => return Ok(WatchdogTick::Inhibited),
            WatchdogStatus::Expired => return Ok(WatchdogTick::Expired),
            WatchdogStatus::Running | WatchdogStatus::Starved => {}
        }

        if self.time_since_refresh(now) >= self.config.timeout() {
            self.state.expire()?;
            tracing::error!(
                since_refresh_us = as_us(self.time_since_refresh(now)),
                missed = self.metrics.consecutive_missed,
                "watchdog expired"
            );
            return Ok(WatchdogTick::Expired);
        }

        let interval = self.config.refresh_interval();
        if self.kicked && self.state.status() == WatchdogStatus::Starved {
            self.state.recover()?;
            self.metrics.record_on_time();
            self.kicked = false;
            self.next_due = now.saturating_add(interval);
            self.refresh(now)?;
            tracing::info!(
                since_refresh_us = as_us(self.time_since_refresh(now)),
                "watchdog kicks resumed, leaving starvation"
            );
            return Ok(WatchdogTick::Refreshed);
        }

        if now < self.next_due {
            return Ok(WatchdogTick::Idle);
        }

        let overdue = now.saturating_sub(self.next_due);
        let late_slots = overdue.as_micros() / interval.as_micros().max(1);
        let mut missed = u32::try_from(late_slots).unwrap_or(u32::MAX);
        if !self.kicked {
            missed = missed.saturating_add(1);
        }
        self.kicked = false;
        self.next_due = now.saturating_add(interval);

        if missed == 0 {
            self.metrics.record_on_time();
            self.refresh(now)?;
            return Ok(WatchdogTick::Refreshed);
        }

        self.metrics.record_missed(missed);
        let consecutive = self.metrics.consecutive_missed;
        if consecutive >= self.config.max_missed_kicks {
            if self.state.status() == WatchdogStatus::Running {
                self.state.starve()?;
                self.metrics.record_starvation();
                tracing::error!(
                    consecutive,
                    limit = self.config.max_missed_kicks,
                    "watchdog starved, withholding refresh"
                );
            }
            return Ok(WatchdogTick::Starved { consecutive });
        }

        tracing::warn!(consecutive, "watchdog kick missed");
        self.refresh(now)?;
        Ok(WatchdogTick::Missed { consecutive })
    }

    /// Refresh immediately, outside the schedule.
    ///
    /// Refused (and counted) while the early-refresh window is still closed.
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::NotRunning`] unless the manager is running.
    pub fn refresh_now(&mut self, now: Timestamp) -> WatchdogResult<WatchdogTick> {
        if self.state.status() != WatchdogStatus::Running {
            return Err(WatchdogError::NotRunning);
        }
        if self.time_since_refresh(now) < self.config.window_open() {
            self.metrics.record_early();
            tracing::debug!(
                since_refresh_us = as_us(self.time_since_refresh(now)),
                "early refresh deferred"
            );
            return Ok(WatchdogTick::Deferred);
        }
        self.refresh(now)?;
        self.next_due = now.saturating_add(self.config.refresh_interval());
        Ok(WatchdogTick::Refreshed)
    }

    fn refresh(&mut self, now: Timestamp) -> WatchdogResult<()> {
        self.peripheral.refresh()?;
        self.last_refresh = now;
        self.metrics.record_refresh(as_us(now));
        Ok(())
    }

    /// Stop refreshing for good so the hardware resets the MCU.
    ///
    /// # Errors
    ///
    /// Returns an error if already tripped.
    pub fn inhibit(&mut self, now: Timestamp) -> WatchdogResult<()> {
        self.state.trip()?;
        tracing::error!(
            since_refresh_us = as_us(self.time_since_refresh(now)),
            "watchdog refresh inhibited, hardware reset pending"
        );
        Ok(())
    }

    /// Running with no outstanding missed kicks.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state.status() == WatchdogStatus::Running && self.metrics.consecutive_missed == 0
    }

    /// Whether the last MCU reset came from the watchdog, as latched at
    /// construction.
    #[must_use]
    pub fn reset_caused_by_watchdog(&self) -> bool {
        self.reset_by_watchdog
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> WatchdogStatus {
        self.state.status()
    }

    /// Snapshot of the metrics.
    #[must_use]
    pub fn metrics(&self) -> WatchdogMetrics {
        self.metrics
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Timing programmed at start.
    #[must_use]
    pub fn timing(&self) -> Option<WatchdogTiming> {
        self.timing
    }

    /// Time since the last hardware refresh.
    #[must_use]
    pub fn time_since_refresh(&self, now: Timestamp) -> Duration {
        now.saturating_sub(self.last_refresh)
    }

    /// Return to `Stopped` and clear the metrics.
    ///
    /// Real hardware cannot be stopped; this only resets supervision, e.g.
    /// after a simulated MCU reset.
    pub fn reset(&mut self) {
        self.state.reset();
        self.metrics.reset();
        self.timing = None;
        self.kicked = false;
        self.next_due = Duration::ZERO;
        self.last_refresh = Duration::ZERO;
    }
}
