//! Error types for fault monitoring.

use crate::faults::FaultType;
use stepper_hal::HalError;
use thiserror::Error;

/// Errors returned by the fault monitor and the device codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FaultError {
    /// The fault is not active.
    #[error("fault {0} is not active")]
    NotActive(FaultType),

    /// The condition behind the fault is still being observed.
    #[error("fault {0} cannot be cleared while its condition persists")]
    ConditionPresent(FaultType),

    /// The fault needs an explicit acknowledgement.
    #[error("fault {0} is not recoverable and must be acknowledged")]
    NotRecoverable(FaultType),

    /// Threshold value out of range.
    #[error("invalid fault threshold: {0}")]
    InvalidThreshold(&'static str),

    /// Daisy chain length out of range.
    #[error("L6470 chain length {len} outside 1..={max}")]
    ChainLength {
        /// Requested length.
        len: usize,
        /// Supported maximum.
        max: usize,
    },

    /// A bus transfer failed.
    #[error("device access failed: {0}")]
    Hal(#[from] HalError),
}

impl FaultError {
    /// Create an invalid threshold error.
    #[must_use]
    pub fn invalid_threshold(reason: &'static str) -> Self {
        Self::InvalidThreshold(reason)
    }
}

/// A specialized `Result` type for fault monitoring.
pub type FaultResult<T> = core::result::Result<T, FaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        assert_eq!(
            FaultError::NotActive(FaultType::DriverThermalWarning).to_string(),
            "fault DriverThermalWarning is not active"
        );
        assert_eq!(
            FaultError::ChainLength { len: 0, max: 8 }.to_string(),
            "L6470 chain length 0 outside 1..=8"
        );
    }
}
