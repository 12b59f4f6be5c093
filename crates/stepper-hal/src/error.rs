//! Error types for HAL operations.

use core::fmt;
use thiserror::Error;

/// Classification of a bus-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusErrorKind {
    /// Addressed device did not acknowledge.
    Nack,
    /// Lost arbitration on a multi-master bus.
    ArbitrationLoss,
    /// Receive data was overwritten before it was read.
    Overrun,
    /// SPI mode fault or chip-select fault.
    ModeFault,
    /// Generic bus error (misplaced start/stop, framing).
    Bus,
    /// Anything the underlying driver could not classify.
    Other,
}

impl fmt::Display for BusErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Nack => "no acknowledge",
            Self::ArbitrationLoss => "arbitration lost",
            Self::Overrun => "overrun",
            Self::ModeFault => "mode fault",
            Self::Bus => "bus error",
            Self::Other => "unclassified error",
        };
        f.write_str(text)
    }
}

/// Errors reported by HAL implementations.
///
/// All variants are `Copy` so they can be returned from RT paths without
/// allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// GPIO read or write failed.
    #[error("GPIO access failed")]
    Gpio,

    /// SPI transfer failed.
    #[error("SPI transfer failed: {kind}")]
    Spi {
        /// Failure classification.
        kind: BusErrorKind,
    },

    /// I2C transfer failed.
    #[error("I2C transfer to 0x{address:02X} failed: {kind}")]
    I2c {
        /// 7-bit device address.
        address: u8,
        /// Failure classification.
        kind: BusErrorKind,
    },

    /// Operation did not complete in time.
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
    },

    /// Watchdog peripheral rejected an operation.
    #[error("watchdog peripheral error: {reason}")]
    Watchdog {
        /// Why the peripheral refused.
        reason: &'static str,
    },

    /// Peripheral used before it was started.
    #[error("peripheral not initialized")]
    NotInitialized,
}

impl HalError {
    /// Create an SPI error.
    #[must_use]
    pub fn spi(kind: BusErrorKind) -> Self {
        Self::Spi { kind }
    }

    /// Create an I2C error.
    #[must_use]
    pub fn i2c(address: u8, kind: BusErrorKind) -> Self {
        Self::I2c { address, kind }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(operation: &'static str) -> Self {
        Self::Timeout { operation }
    }

    /// Create a watchdog error.
    #[must_use]
    pub fn watchdog(reason: &'static str) -> Self {
        Self::Watchdog { reason }
    }
}

/// A specialized `Result` type for HAL operations.
pub type HalResult<T> = core::result::Result<T, HalError>;
