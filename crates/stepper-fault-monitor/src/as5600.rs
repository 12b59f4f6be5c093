//! AS5600 magnetic encoder register access.

use crate::faults::{FaultSet, FaultType};
use stepper_hal::{HalResult, I2cBus};

/// Fixed 7-bit bus address.
pub const ADDRESS: u8 = 0x36;

/// Register map.
pub mod reg {
    /// Magnet status.
    pub const STATUS: u8 = 0x0B;
    /// Unscaled angle, high byte (low byte at `0x0D`).
    pub const RAW_ANGLE: u8 = 0x0C;
    /// Scaled angle, high byte (low byte at `0x0F`).
    pub const ANGLE: u8 = 0x0E;
    /// Automatic gain control.
    pub const AGC: u8 = 0x1A;
    /// CORDIC magnitude, high byte (low byte at `0x1C`).
    pub const MAGNITUDE: u8 = 0x1B;
}

const ANGLE_MASK: u16 = 0x0FFF;

/// Decoded `STATUS` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagnetStatus(pub u8);

impl MagnetStatus {
    /// Magnet too strong.
    pub const MH: u8 = 1 << 3;
    /// Magnet too weak.
    pub const ML: u8 = 1 << 4;
    /// Magnet detected.
    pub const MD: u8 = 1 << 5;

    /// Magnet present at a usable strength.
    pub const NOMINAL: MagnetStatus = MagnetStatus(Self::MD);

    /// A magnet is detected.
    #[must_use]
    pub const fn detected(self) -> bool {
        self.0 & Self::MD != 0
    }

    /// AGC saturated at maximum gain.
    #[must_use]
    pub const fn too_weak(self) -> bool {
        self.0 & Self::ML != 0
    }

    /// AGC saturated at minimum gain.
    #[must_use]
    pub const fn too_strong(self) -> bool {
        self.0 & Self::MH != 0
    }

    /// Encoder faults flagged by this status.
    ///
    /// Without a magnet the strength bits are meaningless and are ignored.
    #[must_use]
    pub fn faults(self) -> FaultSet {
        let mut set = FaultSet::new();
        if !self.detected() {
            set.insert(FaultType::EncoderMagnetMissing);
            return set;
        }
        if self.too_weak() {
            set.insert(FaultType::EncoderMagnetWeak);
        }
        if self.too_strong() {
            set.insert(FaultType::EncoderMagnetStrong);
        }
        set
    }
}

/// AS5600 on an I2C bus.
#[derive(Debug)]
pub struct As5600<I: I2cBus> {
    bus: I,
}

impl<I: I2cBus> As5600<I> {
    /// Driver for the encoder at [`ADDRESS`].
    #[must_use]
    pub fn new(bus: I) -> Self {
        Self { bus }
    }

    fn read_u8(&mut self, register: u8) -> HalResult<u8> {
        let mut buf = [0u8; 1];
        self.bus.read_register(ADDRESS, register, &mut buf)?;
        let [value] = buf;
        Ok(value)
    }

    fn read_u12(&mut self, register: u8) -> HalResult<u16> {
        let mut buf = [0u8; 2];
        self.bus.read_register(ADDRESS, register, &mut buf)?;
        Ok(u16::from_be_bytes(buf) & ANGLE_MASK)
    }

    /// Magnet status.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn status(&mut self) -> HalResult<MagnetStatus> {
        self.read_u8(reg::STATUS).map(MagnetStatus)
    }

    /// Unscaled 12-bit angle.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn raw_angle(&mut self) -> HalResult<u16> {
        self.read_u12(reg::RAW_ANGLE)
    }

    /// Scaled 12-bit angle.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn angle(&mut self) -> HalResult<u16> {
        self.read_u12(reg::ANGLE)
    }

    /// Automatic gain control value.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn agc(&mut self) -> HalResult<u8> {
        self.read_u8(reg::AGC)
    }

    /// 12-bit CORDIC magnitude.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn magnitude(&mut self) -> HalResult<u16> {
        self.read_u12(reg::MAGNITUDE)
    }
}
