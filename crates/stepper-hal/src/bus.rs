//! SPI and I2C bus traits.

use crate::error::HalResult;

/// A full-duplex SPI device behind its own chip select.
///
/// One call is one chip-select frame: CS falls, every byte of `frame` is
/// clocked out, CS rises. The L6470 daisy chain relies on this, since each
/// command byte must be framed separately.
pub trait SpiBus {
    /// Clock `frame` out and replace its contents with the bytes clocked in.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    fn transfer_in_place(&mut self, frame: &mut [u8]) -> HalResult<()>;

    /// Clock `frame` out and discard whatever comes back.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    fn write(&mut self, frame: &[u8]) -> HalResult<()>;
}

/// An I2C controller using 7-bit addressing.
pub trait I2cBus {
    /// Write `bytes` to the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device did not acknowledge or the bus faulted.
    fn write(&mut self, address: u8, bytes: &[u8]) -> HalResult<()>;

    /// Write `bytes`, issue a repeated start, then fill `buffer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device did not acknowledge or the bus faulted.
    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> HalResult<()>;

    /// Read `buffer.len()` consecutive registers starting at `register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device did not acknowledge or the bus faulted.
    fn read_register(&mut self, address: u8, register: u8, buffer: &mut [u8]) -> HalResult<()> {
        self.write_read(address, &[register], buffer)
    }
}
