//! Error types for watchdog management.

use stepper_hal::HalError;
use thiserror::Error;

/// Errors that can occur while managing the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// Configuration value out of range.
    #[error("invalid watchdog configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// No prescaler setting can represent the requested timeout.
    #[error("no {kind} prescaler can represent a {timeout_ms} ms timeout")]
    TimeoutUnreachable {
        /// Peripheral name.
        kind: &'static str,
        /// Requested timeout.
        timeout_ms: u32,
    },

    /// State transition not allowed.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: &'static str,
        /// Attempted target state.
        to: &'static str,
    },

    /// Operation needs a running watchdog.
    #[error("watchdog is not running")]
    NotRunning,

    /// The peripheral failed.
    #[error("watchdog peripheral: {0}")]
    Hal(#[from] HalError),
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: &'static str) -> Self {
        Self::InvalidConfiguration(reason)
    }

    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: &'static str, to: &'static str) -> Self {
        Self::InvalidTransition { from, to }
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = core::result::Result<T, WatchdogError>;
