//! Digital input and output traits.

use crate::error::HalResult;

/// A digital input line.
///
/// Takes `&mut self` like `embedded-hal` 1.0, since some pins need to touch
/// peripheral registers to sample.
pub trait DigitalInput {
    /// Sample the line. `true` means electrically high.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be read.
    fn is_high(&mut self) -> HalResult<bool>;

    /// Sample the line. `true` means electrically low.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be read.
    fn is_low(&mut self) -> HalResult<bool> {
        self.is_high().map(|high| !high)
    }
}

/// A digital output line.
pub trait DigitalOutput {
    /// Drive the line high.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be written.
    fn set_high(&mut self) -> HalResult<()>;

    /// Drive the line low.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be written.
    fn set_low(&mut self) -> HalResult<()>;

    /// Drive the line to the given electrical level.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be written.
    fn set_state(&mut self, high: bool) -> HalResult<()> {
        if high { self.set_high() } else { self.set_low() }
    }
}

/// Electrical level at which a signal counts as asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActiveLevel {
    /// Asserted when the line is low (normally-closed loops, open-drain flags).
    #[default]
    Low,
    /// Asserted when the line is high.
    High,
}

impl ActiveLevel {
    /// Translate an electrical level into a logical asserted flag.
    #[must_use]
    pub fn is_asserted(self, line_high: bool) -> bool {
        match self {
            Self::Low => !line_high,
            Self::High => line_high,
        }
    }

    /// Sample `input` and return whether it is asserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin could not be read.
    pub fn sample<I: DigitalInput + ?Sized>(self, input: &mut I) -> HalResult<bool> {
        input.is_high().map(|high| self.is_asserted(high))
    }
}
