//! Error types for emergency-stop handling.

use core::fmt;
use thiserror::Error;

/// Why a reset request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResetRefusal {
    /// Nothing to reset.
    NotTriggered,
    /// At least one channel still reads active.
    InputActive,
    /// The channels do not agree.
    ChannelsDisagree,
    /// The minimum latch time has not elapsed.
    LatchTimeNotElapsed,
}

impl fmt::Display for ResetRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResetRefusal::NotTriggered => "e-stop is not triggered",
            ResetRefusal::InputActive => "e-stop input still active",
            ResetRefusal::ChannelsDisagree => "e-stop channels disagree",
            ResetRefusal::LatchTimeNotElapsed => "minimum latch time not elapsed",
        })
    }
}

/// Errors from the emergency-stop handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EStopError {
    /// Configuration value out of range.
    #[error("invalid e-stop configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// Dual-channel mode without a second input.
    #[error("dual-channel e-stop requires channel B")]
    MissingChannelB,

    /// Reset conditions not met.
    #[error("e-stop reset refused: {0}")]
    ResetRefused(ResetRefusal),
}

impl EStopError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: &'static str) -> Self {
        Self::InvalidConfiguration(reason)
    }
}

/// A specialized `Result` type for emergency-stop operations.
pub type EStopResult<T> = core::result::Result<T, EStopError>;
