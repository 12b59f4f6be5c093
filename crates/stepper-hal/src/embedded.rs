//! Adapters from `embedded-hal` 1.0 peripherals to the stepper HAL traits.
//!
//! Every STM32 HAL crate implements the `embedded-hal` traits, so a board only
//! has to wrap its pins and buses here to satisfy [`Platform`](crate::Platform).
//! Underlying errors are classified through the `embedded-hal` `ErrorKind`s and
//! never panic.

use crate::bus::{I2cBus, SpiBus};
use crate::error::{BusErrorKind, HalError, HalResult};
use crate::gpio::{DigitalInput, DigitalOutput};
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

fn gpio_error<E: digital::Error>(err: &E) -> HalError {
    tracing::debug!(kind = ?err.kind(), "gpio access failed");
    HalError::Gpio
}

fn spi_error<E: spi::Error>(err: &E) -> HalError {
    let kind = match err.kind() {
        spi::ErrorKind::Overrun => BusErrorKind::Overrun,
        spi::ErrorKind::ModeFault | spi::ErrorKind::ChipSelectFault => BusErrorKind::ModeFault,
        spi::ErrorKind::FrameFormat => BusErrorKind::Bus,
        _ => BusErrorKind::Other,
    };
    tracing::debug!(kind = ?err.kind(), "spi transfer failed");
    HalError::spi(kind)
}

fn i2c_error<E: i2c::Error>(address: u8, err: &E) -> HalError {
    let kind = match err.kind() {
        i2c::ErrorKind::NoAcknowledge(_) => BusErrorKind::Nack,
        i2c::ErrorKind::ArbitrationLoss => BusErrorKind::ArbitrationLoss,
        i2c::ErrorKind::Overrun => BusErrorKind::Overrun,
        i2c::ErrorKind::Bus => BusErrorKind::Bus,
        _ => BusErrorKind::Other,
    };
    tracing::debug!(address, kind = ?err.kind(), "i2c transfer failed");
    HalError::i2c(address, kind)
}

/// Wraps an `embedded-hal` [`InputPin`].
#[derive(Debug)]
pub struct EhInput<P>(pub P);

impl<P: InputPin> DigitalInput for EhInput<P> {
    fn is_high(&mut self) -> HalResult<bool> {
        self.0.is_high().map_err(|e| gpio_error(&e))
    }
}

/// Wraps an `embedded-hal` [`OutputPin`].
#[derive(Debug)]
pub struct EhOutput<P>(pub P);

impl<P: OutputPin> DigitalOutput for EhOutput<P> {
    fn set_high(&mut self) -> HalResult<()> {
        self.0.set_high().map_err(|e| gpio_error(&e))
    }

    fn set_low(&mut self) -> HalResult<()> {
        self.0.set_low().map_err(|e| gpio_error(&e))
    }
}

/// Wraps an `embedded-hal` [`SpiDevice`].
///
/// `SpiDevice` owns chip select, so one call here is one CS frame.
#[derive(Debug)]
pub struct EhSpi<D>(pub D);

impl<D: SpiDevice> SpiBus for EhSpi<D> {
    fn transfer_in_place(&mut self, frame: &mut [u8]) -> HalResult<()> {
        self.0.transfer_in_place(frame).map_err(|e| spi_error(&e))
    }

    fn write(&mut self, frame: &[u8]) -> HalResult<()> {
        self.0.write(frame).map_err(|e| spi_error(&e))
    }
}

/// Wraps an `embedded-hal` [`I2c`] controller.
#[derive(Debug)]
pub struct EhI2c<I>(pub I);

impl<I: I2c> I2cBus for EhI2c<I> {
    fn write(&mut self, address: u8, bytes: &[u8]) -> HalResult<()> {
        self.0.write(address, bytes).map_err(|e| i2c_error(address, &e))
    }

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> HalResult<()> {
        self.0
            .write_read(address, bytes, buffer)
            .map_err(|e| i2c_error(address, &e))
    }
}
