//! Error types for the safety system.

use crate::state::SafetyState;
use stepper_estop::EStopError;
use stepper_fault_monitor::{FaultError, FaultType};
use stepper_hal::HalError;
use stepper_watchdog::WatchdogError;
use thiserror::Error;

/// Errors from the safety system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// Configuration value out of range.
    #[error("invalid safety configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// The state machine does not allow this change.
    #[error("invalid safety state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: SafetyState,
        /// Requested state.
        to: SafetyState,
    },

    /// Recovery was requested while no fault or e-stop is latched.
    #[error("nothing to recover from in state {0}")]
    NothingToRecover(SafetyState),

    /// Recovery needs a running watchdog with no missed kicks.
    #[error("recovery refused: watchdog is not healthy")]
    WatchdogUnhealthy,

    /// A latched fault cannot be cleared yet.
    #[error("recovery refused: fault {0} is still present or needs acknowledgement")]
    FaultsRemain(FaultType),

    /// E-stop handler error, including a refused reset.
    #[error(transparent)]
    EStop(#[from] EStopError),

    /// Watchdog manager error.
    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    /// Fault monitor error.
    #[error(transparent)]
    Fault(#[from] FaultError),

    /// Shutdown output could not be driven.
    #[error("motor shutdown failed: {0}")]
    Shutdown(#[from] HalError),
}

impl SafetyError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: &'static str) -> Self {
        Self::InvalidConfiguration(reason)
    }

    /// Whether the error is a refused request rather than a hardware problem.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::NothingToRecover(_)
                | Self::WatchdogUnhealthy
                | Self::FaultsRemain(_)
                | Self::EStop(EStopError::ResetRefused(_))
                | Self::Fault(
                    FaultError::NotActive(_)
                        | FaultError::ConditionPresent(_)
                        | FaultError::NotRecoverable(_)
                )
        )
    }
}

/// A specialized `Result` type for safety-system operations.
pub type SafetyResult<T> = core::result::Result<T, SafetyError>;
