//! Safety-system configuration.
//!
//! [`SafetyConfig`] is the single source of truth for every timing value in
//! the safety core. Component configurations are embedded as-is and validated
//! by their own crates.

use crate::error::{SafetyError, SafetyResult};
use core::time::Duration;
use stepper_estop::EStopConfig;
use stepper_fault_monitor::{FaultThresholds, MAX_CHAIN_LEN};
use stepper_watchdog::WatchdogConfig;

/// Depth of the safety event log.
pub const EVENT_LOG_DEPTH: usize = 32;

/// Complete safety-core configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyConfig {
    /// Emergency-stop input handling.
    pub estop: EStopConfig,

    /// Watchdog timing and supervision.
    pub watchdog: WatchdogConfig,

    /// Fault detection thresholds.
    pub faults: FaultThresholds,

    /// Fault-free time required in `Recovery` before motion is allowed again.
    ///
    /// Default: 500 ms.
    pub recovery_hold_ms: u32,

    /// Number of L6470 drivers on the daisy chain.
    ///
    /// Default: 2.
    pub motor_count: u8,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            estop: EStopConfig::default(),
            watchdog: WatchdogConfig::default(),
            faults: FaultThresholds::default(),
            recovery_hold_ms: 500,
            motor_count: 2,
        }
    }
}

impl SafetyConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> SafetyConfigBuilder {
        SafetyConfigBuilder::default()
    }

    /// Validate this configuration and every embedded component
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns the first component error, or
    /// [`SafetyError::InvalidConfiguration`] for the safety-level values.
    pub fn validate(&self) -> SafetyResult<()> {
        self.estop.validate()?;
        self.watchdog.validate()?;
        self.faults.validate()?;

        if self.motor_count == 0 || usize::from(self.motor_count) > MAX_CHAIN_LEN {
            return Err(SafetyError::invalid_configuration(
                "motor_count must be between 1 and the maximum chain length",
            ));
        }
        if self.recovery_hold_ms < self.estop.min_latch_ms {
            return Err(SafetyError::invalid_configuration(
                "recovery_hold_ms must not be shorter than the e-stop minimum latch",
            ));
        }
        if self.faults.poll_interval_ms >= self.watchdog.timeout_ms {
            return Err(SafetyError::invalid_configuration(
                "fault poll interval must be shorter than the watchdog timeout",
            ));
        }
        Ok(())
    }

    /// Recovery hold as a `Duration`.
    #[must_use]
    pub fn recovery_hold(&self) -> Duration {
        Duration::from_millis(u64::from(self.recovery_hold_ms))
    }
}

/// Builder for [`SafetyConfig`].
#[derive(Debug, Clone, Default)]
pub struct SafetyConfigBuilder {
    config: SafetyConfig,
}

impl SafetyConfigBuilder {
    /// Set the e-stop configuration.
    #[must_use]
    pub fn estop(mut self, estop: EStopConfig) -> Self {
        self.config.estop = estop;
        self
    }

    /// Set the watchdog configuration.
    #[must_use]
    pub fn watchdog(mut self, watchdog: WatchdogConfig) -> Self {
        self.config.watchdog = watchdog;
        self
    }

    /// Set the fault thresholds.
    #[must_use]
    pub fn faults(mut self, faults: FaultThresholds) -> Self {
        self.config.faults = faults;
        self
    }

    /// Set the recovery hold time.
    #[must_use]
    pub fn recovery_hold_ms(mut self, ms: u32) -> Self {
        self.config.recovery_hold_ms = ms;
        self
    }

    /// Set the number of drivers on the chain.
    #[must_use]
    pub fn motor_count(mut self, count: u8) -> Self {
        self.config.motor_count = count;
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> SafetyResult<SafetyConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SafetyConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.recovery_hold(), Duration::from_millis(500));
    }

    #[test]
    fn test_component_errors_propagate() {
        let config = SafetyConfig {
            faults: FaultThresholds {
                spi_max_consecutive_errors: 0,
                ..FaultThresholds::default()
            },
            ..SafetyConfig::default()
        };
        assert!(matches!(config.validate(), Err(SafetyError::Fault(_))));

        let config = SafetyConfig {
            estop: EStopConfig {
                debounce_ms: 500,
                ..EStopConfig::default()
            },
            ..SafetyConfig::default()
        };
        assert!(matches!(config.validate(), Err(SafetyError::EStop(_))));
    }

    #[test]
    fn test_motor_count_bounds() {
        assert!(matches!(
            SafetyConfig::builder().motor_count(0).build(),
            Err(SafetyError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SafetyConfig::builder().motor_count(9).build(),
            Err(SafetyError::InvalidConfiguration(_))
        ));
        assert!(matches!(SafetyConfig::builder().motor_count(8).build(), Ok(_)));
    }

    #[test]
    fn test_recovery_hold_not_shorter_than_latch() {
        let result = SafetyConfig::builder().recovery_hold_ms(50).build();
        assert!(matches!(result, Err(SafetyError::InvalidConfiguration(_))));
    }
}
