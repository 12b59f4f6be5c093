//! Emergency-stop configuration.

use crate::error::{EStopError, EStopResult};
use core::time::Duration;
use stepper_hal::ActiveLevel;

/// Emergency-stop timing and wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EStopConfig {
    /// Time a level must hold before it is accepted.
    ///
    /// Default: 10 ms.
    pub debounce_ms: u32,

    /// Require the redundant channel B.
    pub dual_channel: bool,

    /// How long the channels may disagree before it counts as a wiring fault.
    ///
    /// Default: 50 ms.
    pub discrepancy_ms: u32,

    /// Budget from detection to outputs disabled.
    ///
    /// Default: 10 ms.
    pub max_response_ms: u32,

    /// Minimum time latched before a reset is accepted.
    ///
    /// Default: 100 ms.
    pub min_latch_ms: u32,

    /// Level at which channel A reads as pressed. NC loop, so low.
    pub channel_a_active: ActiveLevel,

    /// Level at which channel B reads as pressed. Complementary to A.
    pub channel_b_active: ActiveLevel,
}

impl Default for EStopConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 10,
            dual_channel: true,
            discrepancy_ms: 50,
            max_response_ms: 10,
            min_latch_ms: 100,
            channel_a_active: ActiveLevel::Low,
            channel_b_active: ActiveLevel::High,
        }
    }
}

impl EStopConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> EStopConfigBuilder {
        EStopConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> EStopResult<()> {
        if self.debounce_ms > 100 {
            return Err(EStopError::invalid_configuration(
                "debounce_ms must be at most 100",
            ));
        }
        if self.dual_channel && self.discrepancy_ms <= self.debounce_ms {
            return Err(EStopError::invalid_configuration(
                "discrepancy_ms must exceed debounce_ms",
            ));
        }
        if self.max_response_ms == 0 {
            return Err(EStopError::invalid_configuration(
                "max_response_ms must be at least 1",
            ));
        }
        if self.min_latch_ms < self.debounce_ms {
            return Err(EStopError::invalid_configuration(
                "min_latch_ms must not be shorter than debounce_ms",
            ));
        }
        Ok(())
    }

    /// Debounce time as a `Duration`.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.debounce_ms))
    }

    /// Discrepancy window as a `Duration`.
    #[must_use]
    pub fn discrepancy(&self) -> Duration {
        Duration::from_millis(u64::from(self.discrepancy_ms))
    }

    /// Response budget as a `Duration`.
    #[must_use]
    pub fn max_response(&self) -> Duration {
        Duration::from_millis(u64::from(self.max_response_ms))
    }

    /// Minimum latch time as a `Duration`.
    #[must_use]
    pub fn min_latch(&self) -> Duration {
        Duration::from_millis(u64::from(self.min_latch_ms))
    }
}

/// Builder for [`EStopConfig`].
#[derive(Debug, Clone, Default)]
pub struct EStopConfigBuilder {
    config: EStopConfig,
}

impl EStopConfigBuilder {
    /// Set the debounce time.
    #[must_use]
    pub fn debounce_ms(mut self, ms: u32) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    /// Enable or disable channel B.
    #[must_use]
    pub fn dual_channel(mut self, enabled: bool) -> Self {
        self.config.dual_channel = enabled;
        self
    }

    /// Set the discrepancy window.
    #[must_use]
    pub fn discrepancy_ms(mut self, ms: u32) -> Self {
        self.config.discrepancy_ms = ms;
        self
    }

    /// Set the response budget.
    #[must_use]
    pub fn max_response_ms(mut self, ms: u32) -> Self {
        self.config.max_response_ms = ms;
        self
    }

    /// Set the minimum latch time.
    #[must_use]
    pub fn min_latch_ms(mut self, ms: u32) -> Self {
        self.config.min_latch_ms = ms;
        self
    }

    /// Set channel A's active level.
    #[must_use]
    pub fn channel_a_active(mut self, level: ActiveLevel) -> Self {
        self.config.channel_a_active = level;
        self
    }

    /// Set channel B's active level.
    #[must_use]
    pub fn channel_b_active(mut self, level: ActiveLevel) -> Self {
        self.config.channel_b_active = level;
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> EStopResult<EStopConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EStopConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.debounce(), Duration::from_millis(10));
        assert_eq!(config.min_latch(), Duration::from_millis(100));
    }

    #[test]
    fn test_discrepancy_must_exceed_debounce() {
        assert_eq!(
            EStopConfig::builder().discrepancy_ms(10).build(),
            Err(EStopError::InvalidConfiguration(
                "discrepancy_ms must exceed debounce_ms"
            ))
        );
        assert_eq!(
            EStopConfig::builder()
                .dual_channel(false)
                .discrepancy_ms(0)
                .build()
                .map(|config| config.dual_channel),
            Ok(false)
        );
    }
}
