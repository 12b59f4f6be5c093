//! Fault taxonomy, thresholds and fault bookkeeping types.

use crate::error::{FaultError, FaultResult};
use core::fmt;
use stepper_hal::Timestamp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Every fault the safety core can raise.
///
/// The discriminant is the bit index in a [`FaultSet`] and the value published
/// in the shared fault word, so variants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FaultType {
    /// L6470 overcurrent detection (OCD).
    DriverOvercurrent = 0,
    /// L6470 thermal shutdown (TH_SD).
    DriverThermalShutdown = 1,
    /// L6470 thermal warning (TH_WRN).
    DriverThermalWarning = 2,
    /// L6470 supply undervoltage lockout (UVLO).
    DriverUndervoltage = 3,
    /// L6470 stall detection on either bridge (STEP_LOSS_A/B).
    DriverStepLoss = 4,
    /// L6470 rejected or could not perform a command.
    DriverCommandError = 5,
    /// The wired-OR FLAG line is asserted.
    DriverFlagAsserted = 6,
    /// The driver chain stopped answering on SPI.
    MotorSpiFailure = 7,
    /// AS5600 reports no magnet.
    EncoderMagnetMissing = 8,
    /// AS5600 reports the magnet too weak.
    EncoderMagnetWeak = 9,
    /// AS5600 reports the magnet too strong.
    EncoderMagnetStrong = 10,
    /// The encoder stopped answering on I2C.
    EncoderI2cFailure = 11,
    /// The application missed a watchdog kick.
    WatchdogLateRefresh = 12,
    /// Refreshes are withheld after too many missed kicks.
    WatchdogStarvation = 13,
    /// The last MCU reset was caused by the watchdog.
    WatchdogReset = 14,
    /// The two e-stop channels disagreed for too long.
    EStopChannelMismatch = 15,
    /// Disabling the outputs took longer than the response budget.
    EStopResponseOverrun = 16,
    /// Reported by another subsystem.
    External = 17,
}

impl FaultType {
    /// Every fault type in bit order.
    pub const ALL: [FaultType; 18] = [
        FaultType::DriverOvercurrent,
        FaultType::DriverThermalShutdown,
        FaultType::DriverThermalWarning,
        FaultType::DriverUndervoltage,
        FaultType::DriverStepLoss,
        FaultType::DriverCommandError,
        FaultType::DriverFlagAsserted,
        FaultType::MotorSpiFailure,
        FaultType::EncoderMagnetMissing,
        FaultType::EncoderMagnetWeak,
        FaultType::EncoderMagnetStrong,
        FaultType::EncoderI2cFailure,
        FaultType::WatchdogLateRefresh,
        FaultType::WatchdogStarvation,
        FaultType::WatchdogReset,
        FaultType::EStopChannelMismatch,
        FaultType::EStopResponseOverrun,
        FaultType::External,
    ];

    /// Bit index in a [`FaultSet`].
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Inverse of [`bit`](Self::bit).
    #[must_use]
    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.get(usize::from(bit)).copied()
    }

    /// Classification of this fault.
    #[must_use]
    pub const fn severity(self) -> FaultSeverity {
        match self {
            FaultType::DriverThermalWarning
            | FaultType::DriverCommandError
            | FaultType::EncoderMagnetWeak
            | FaultType::EncoderMagnetStrong
            | FaultType::WatchdogLateRefresh
            | FaultType::EStopResponseOverrun => FaultSeverity::Warning,
            FaultType::WatchdogStarvation | FaultType::EStopChannelMismatch => {
                FaultSeverity::Emergency
            }
            FaultType::DriverOvercurrent
            | FaultType::DriverThermalShutdown
            | FaultType::DriverUndervoltage
            | FaultType::DriverStepLoss
            | FaultType::DriverFlagAsserted
            | FaultType::MotorSpiFailure
            | FaultType::EncoderMagnetMissing
            | FaultType::EncoderI2cFailure
            | FaultType::WatchdogReset
            | FaultType::External => FaultSeverity::Critical,
        }
    }

    /// Whether the fault can be cleared by a recovery request.
    ///
    /// A watchdog reset has to be acknowledged explicitly.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, FaultType::WatchdogReset)
    }

    /// Output action for this fault.
    #[must_use]
    pub const fn default_action(self) -> FaultAction {
        match self.severity() {
            FaultSeverity::Warning => FaultAction::LogOnly,
            FaultSeverity::Emergency => FaultAction::EmergencyStop,
            FaultSeverity::Critical => match self {
                FaultType::DriverOvercurrent
                | FaultType::DriverThermalShutdown
                | FaultType::DriverUndervoltage => FaultAction::HardHiZ,
                _ => FaultAction::HardStop,
            },
        }
    }

    /// Variant name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FaultType::DriverOvercurrent => "DriverOvercurrent",
            FaultType::DriverThermalShutdown => "DriverThermalShutdown",
            FaultType::DriverThermalWarning => "DriverThermalWarning",
            FaultType::DriverUndervoltage => "DriverUndervoltage",
            FaultType::DriverStepLoss => "DriverStepLoss",
            FaultType::DriverCommandError => "DriverCommandError",
            FaultType::DriverFlagAsserted => "DriverFlagAsserted",
            FaultType::MotorSpiFailure => "MotorSpiFailure",
            FaultType::EncoderMagnetMissing => "EncoderMagnetMissing",
            FaultType::EncoderMagnetWeak => "EncoderMagnetWeak",
            FaultType::EncoderMagnetStrong => "EncoderMagnetStrong",
            FaultType::EncoderI2cFailure => "EncoderI2cFailure",
            FaultType::WatchdogLateRefresh => "WatchdogLateRefresh",
            FaultType::WatchdogStarvation => "WatchdogStarvation",
            FaultType::WatchdogReset => "WatchdogReset",
            FaultType::EStopChannelMismatch => "EStopChannelMismatch",
            FaultType::EStopResponseOverrun => "EStopResponseOverrun",
            FaultType::External => "External",
        }
    }

    /// One-line description for operators.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            FaultType::DriverOvercurrent => "Driver overcurrent protection triggered",
            FaultType::DriverThermalShutdown => "Driver thermal shutdown",
            FaultType::DriverThermalWarning => "Driver temperature high",
            FaultType::DriverUndervoltage => "Driver supply undervoltage",
            FaultType::DriverStepLoss => "Driver detected a stall",
            FaultType::DriverCommandError => "Driver rejected a command",
            FaultType::DriverFlagAsserted => "Driver FLAG line asserted",
            FaultType::MotorSpiFailure => "Driver chain not responding",
            FaultType::EncoderMagnetMissing => "Encoder magnet not detected",
            FaultType::EncoderMagnetWeak => "Encoder magnet too weak",
            FaultType::EncoderMagnetStrong => "Encoder magnet too strong",
            FaultType::EncoderI2cFailure => "Encoder not responding",
            FaultType::WatchdogLateRefresh => "Watchdog kick missed",
            FaultType::WatchdogStarvation => "Watchdog starved",
            FaultType::WatchdogReset => "Previous reset caused by watchdog",
            FaultType::EStopChannelMismatch => "Emergency stop channels disagree",
            FaultType::EStopResponseOverrun => "Emergency stop response too slow",
            FaultType::External => "Fault reported by another subsystem",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault classification, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FaultSeverity {
    /// Degraded but safe to move. Clears on its own.
    Warning,
    /// Motion stops until the fault is cleared.
    Critical,
    /// Treated like an emergency stop.
    Emergency,
}

impl FaultSeverity {
    /// Whether faults of this severity stay active until cleared explicitly.
    #[must_use]
    pub const fn is_latching(self) -> bool {
        !matches!(self, FaultSeverity::Warning)
    }

    /// Severity name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FaultSeverity::Warning => "Warning",
            FaultSeverity::Critical => "Critical",
            FaultSeverity::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for FaultSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the outputs should do for a fault, ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FaultAction {
    /// Record the fault and keep running.
    LogOnly,
    /// Stop the motors immediately, holding position.
    HardStop,
    /// Put every bridge in high impedance.
    HardHiZ,
    /// Full emergency stop: bridges off and drivers held in standby.
    EmergencyStop,
}

/// Where a fault was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FaultSource {
    /// L6470 at the given chain position.
    Driver(u8),
    /// AS5600 encoder.
    Encoder,
    /// Driver FLAG line.
    FlagPin,
    /// Watchdog manager.
    Watchdog,
    /// Emergency-stop handling.
    EmergencyStop,
    /// Another subsystem.
    External,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Driver(index) => write!(f, "driver {index}"),
            FaultSource::Encoder => f.write_str("encoder"),
            FaultSource::FlagPin => f.write_str("flag pin"),
            FaultSource::Watchdog => f.write_str("watchdog"),
            FaultSource::EmergencyStop => f.write_str("e-stop"),
            FaultSource::External => f.write_str("external"),
        }
    }
}

/// A set of [`FaultType`]s stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct FaultSet(u32);

impl FaultSet {
    /// The empty set.
    pub const EMPTY: FaultSet = FaultSet(0);

    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Build a set from raw bits, dropping bits that name no fault.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::valid_mask())
    }

    const fn valid_mask() -> u32 {
        (1u32 << FaultType::ALL.len()) - 1
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Add a fault. Returns true if it was not present.
    pub fn insert(&mut self, fault: FaultType) -> bool {
        let added = !self.contains(fault);
        self.0 |= 1 << fault.bit();
        added
    }

    /// Remove a fault. Returns true if it was present.
    pub fn remove(&mut self, fault: FaultType) -> bool {
        let present = self.contains(fault);
        self.0 &= !(1 << fault.bit());
        present
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(self, fault: FaultType) -> bool {
        self.0 & (1 << fault.bit()) != 0
    }

    /// Returns true if no fault is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of faults in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Faults in either set.
    #[must_use]
    pub const fn union(self, other: FaultSet) -> FaultSet {
        FaultSet(self.0 | other.0)
    }

    /// Iterate in bit order.
    #[must_use]
    pub fn iter(self) -> FaultSetIter {
        FaultSetIter { bits: self.0 }
    }

    /// Most severe classification present.
    #[must_use]
    pub fn highest_severity(self) -> Option<FaultSeverity> {
        self.iter().map(FaultType::severity).max()
    }

    /// Strongest output action any member asks for.
    #[must_use]
    pub fn strongest_action(self) -> Option<FaultAction> {
        self.iter().map(FaultType::default_action).max()
    }
}

impl FromIterator<FaultType> for FaultSet {
    fn from_iter<T: IntoIterator<Item = FaultType>>(iter: T) -> Self {
        let mut set = FaultSet::new();
        for fault in iter {
            set.insert(fault);
        }
        set
    }
}

impl IntoIterator for FaultSet {
    type Item = FaultType;
    type IntoIter = FaultSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`FaultSet`].
#[derive(Debug, Clone)]
pub struct FaultSetIter {
    bits: u32,
}

impl Iterator for FaultSetIter {
    type Item = FaultType;

    fn next(&mut self) -> Option<FaultType> {
        while self.bits != 0 {
            let bit = self.bits.trailing_zeros();
            self.bits &= self.bits.wrapping_sub(1);
            if let Some(fault) = u8::try_from(bit).ok().and_then(FaultType::from_bit) {
                return Some(fault);
            }
        }
        None
    }
}

/// Bookkeeping for one fault type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaultRecord {
    /// The fault.
    pub fault: FaultType,
    /// Where it was last seen.
    pub source: FaultSource,
    /// First time the fault was ever raised.
    pub first_seen: Timestamp,
    /// Most recent observation of the condition.
    pub last_seen: Timestamp,
    /// Number of inactive-to-active edges.
    pub occurrences: u32,
    /// Whether the fault is currently active.
    pub active: bool,
}

impl FaultRecord {
    /// Record for a fault raised for the first time.
    #[must_use]
    pub fn new(fault: FaultType, source: FaultSource, now: Timestamp) -> Self {
        Self {
            fault,
            source,
            first_seen: now,
            last_seen: now,
            occurrences: 1,
            active: true,
        }
    }
}

/// Detection thresholds and timing for the fault monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FaultThresholds {
    /// Minimum time between device polls.
    pub poll_interval_ms: u32,
    /// Consecutive SPI errors before `MotorSpiFailure`.
    pub spi_max_consecutive_errors: u32,
    /// Consecutive I2C errors before `EncoderI2cFailure`.
    pub i2c_max_consecutive_errors: u32,
    /// Consecutive asserted FLAG samples before `DriverFlagAsserted`.
    pub flag_debounce_samples: u32,
    /// How long a warning condition must be absent before it clears itself.
    pub warning_clear_ms: u32,
}

impl Default for FaultThresholds {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            spi_max_consecutive_errors: 3,
            i2c_max_consecutive_errors: 5,
            flag_debounce_samples: 2,
            warning_clear_ms: 100,
        }
    }
}

impl FaultThresholds {
    /// Validate thresholds are within safe operating ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if any threshold is outside safe bounds.
    pub fn validate(&self) -> FaultResult<()> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 100 {
            return Err(FaultError::invalid_threshold(
                "poll_interval_ms must be within 1..=100",
            ));
        }
        if self.spi_max_consecutive_errors == 0 {
            return Err(FaultError::invalid_threshold(
                "spi_max_consecutive_errors must be at least 1",
            ));
        }
        if self.i2c_max_consecutive_errors == 0 {
            return Err(FaultError::invalid_threshold(
                "i2c_max_consecutive_errors must be at least 1",
            ));
        }
        if self.flag_debounce_samples == 0 {
            return Err(FaultError::invalid_threshold(
                "flag_debounce_samples must be at least 1",
            ));
        }
        if self.warning_clear_ms < self.poll_interval_ms {
            return Err(FaultError::invalid_threshold(
                "warning_clear_ms must not be shorter than the poll interval",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_match_table_order() {
        for (index, fault) in FaultType::ALL.iter().enumerate() {
            assert_eq!(usize::from(fault.bit()), index);
            assert_eq!(FaultType::from_bit(fault.bit()), Some(*fault));
        }
        assert_eq!(FaultType::from_bit(18), None);
    }

    #[test]
    fn test_default_actions() {
        assert_eq!(FaultType::DriverOvercurrent.default_action(), FaultAction::HardHiZ);
        assert_eq!(FaultType::DriverUndervoltage.default_action(), FaultAction::HardHiZ);
        assert_eq!(FaultType::DriverStepLoss.default_action(), FaultAction::HardStop);
        assert_eq!(FaultType::EncoderI2cFailure.default_action(), FaultAction::HardStop);
        assert_eq!(FaultType::WatchdogStarvation.default_action(), FaultAction::EmergencyStop);
        assert_eq!(FaultType::EncoderMagnetWeak.default_action(), FaultAction::LogOnly);
    }

    #[test]
    fn test_only_watchdog_reset_is_unrecoverable() {
        let unrecoverable: FaultSet = FaultType::ALL
            .iter()
            .copied()
            .filter(|fault| !fault.is_recoverable())
            .collect();
        assert_eq!(
            unrecoverable.iter().collect::<alloc::vec::Vec<_>>(),
            [FaultType::WatchdogReset]
        );
    }

    #[test]
    fn test_fault_set_operations() {
        let mut set = FaultSet::new();
        assert!(set.insert(FaultType::EncoderMagnetWeak));
        assert!(!set.insert(FaultType::EncoderMagnetWeak));
        assert!(set.insert(FaultType::External));
        assert_eq!(set.len(), 2);
        assert_eq!(set.highest_severity(), Some(FaultSeverity::Critical));
        assert_eq!(set.strongest_action(), Some(FaultAction::HardStop));

        assert!(set.remove(FaultType::External));
        assert!(!set.remove(FaultType::External));
        assert_eq!(set.highest_severity(), Some(FaultSeverity::Warning));
        assert_eq!(FaultSet::from_bits(u32::MAX).len(), 18);
    }

    #[test]
    fn test_default_thresholds_validate() {
        assert_eq!(FaultThresholds::default().validate(), Ok(()));
    }

    #[test]
    fn test_thresholds_validation() {
        let thresholds = FaultThresholds {
            flag_debounce_samples: 0,
            ..FaultThresholds::default()
        };
        assert!(matches!(thresholds.validate(), Err(FaultError::InvalidThreshold(_))));

        let thresholds = FaultThresholds {
            warning_clear_ms: 5,
            ..FaultThresholds::default()
        };
        assert!(matches!(thresholds.validate(), Err(FaultError::InvalidThreshold(_))));
    }
}
