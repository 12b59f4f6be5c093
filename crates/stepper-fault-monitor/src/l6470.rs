//! L6470 dSPIN status decoding and the daisy-chained command path.
//!
//! The L6470 shifts one byte per chip-select frame. With `n` drivers on the
//! chain every frame carries `n` bytes, byte `i` addressing driver `i`.

use crate::error::{FaultError, FaultResult};
use crate::faults::{FaultSet, FaultType};
use core::fmt;
use stepper_hal::{HalResult, SpiBus};

/// Longest supported daisy chain.
pub const MAX_CHAIN_LEN: usize = 8;

/// Per-device statuses from one chain read.
pub type ChainStatus = heapless::Vec<L6470Status, MAX_CHAIN_LEN>;

/// Application commands used by the safety core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// No operation; also used to clock out response bytes.
    Nop = 0x00,
    /// Read and clear the STATUS register.
    GetStatus = 0xD0,
    /// Decelerate to zero, then hold.
    SoftStop = 0xB0,
    /// Stop immediately and hold.
    HardStop = 0xB8,
    /// Decelerate to zero, then disable the bridges.
    SoftHiZ = 0xA0,
    /// Disable the bridges immediately.
    HardHiZ = 0xA8,
}

impl Command {
    /// Opcode byte.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

/// Motor state from `MOT_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorStatus {
    /// Not moving.
    Stopped,
    /// Ramping up.
    Accelerating,
    /// Ramping down.
    Decelerating,
    /// At target speed.
    ConstantSpeed,
}

/// Raw L6470 STATUS register.
///
/// Alarm bits (UVLO, TH_WRN, TH_SD, OCD, STEP_LOSS_A/B) are active low and
/// latched until the register is read.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct L6470Status(pub u16);

impl L6470Status {
    /// Bridges in high impedance.
    pub const HIZ: u16 = 1 << 0;
    /// Low while a command is executing.
    pub const BUSY: u16 = 1 << 1;
    /// Switch input level.
    pub const SW_F: u16 = 1 << 2;
    /// Switch turn-on event.
    pub const SW_EVN: u16 = 1 << 3;
    /// Forward direction.
    pub const DIR: u16 = 1 << 4;
    /// Motor status field mask.
    pub const MOT_STATUS: u16 = 0b11 << 5;
    /// Command could not be performed.
    pub const NOTPERF_CMD: u16 = 1 << 7;
    /// Command does not exist.
    pub const WRONG_CMD: u16 = 1 << 8;
    /// Undervoltage lockout (active low).
    pub const UVLO: u16 = 1 << 9;
    /// Thermal warning (active low).
    pub const TH_WRN: u16 = 1 << 10;
    /// Thermal shutdown (active low).
    pub const TH_SD: u16 = 1 << 11;
    /// Overcurrent (active low).
    pub const OCD: u16 = 1 << 12;
    /// Stall on bridge A (active low).
    pub const STEP_LOSS_A: u16 = 1 << 13;
    /// Stall on bridge B (active low).
    pub const STEP_LOSS_B: u16 = 1 << 14;
    /// Step-clock mode.
    pub const SCK_MOD: u16 = 1 << 15;

    /// Status of an idle driver with no alarms and the bridges off.
    pub const IDLE: L6470Status = L6470Status(
        Self::HIZ
            | Self::BUSY
            | Self::UVLO
            | Self::TH_WRN
            | Self::TH_SD
            | Self::OCD
            | Self::STEP_LOSS_A
            | Self::STEP_LOSS_B,
    );

    /// Assemble from the two bytes clocked out after `GET_STATUS`.
    #[must_use]
    pub const fn from_bytes(msb: u8, lsb: u8) -> Self {
        Self(u16::from_be_bytes([msb, lsb]))
    }

    /// Raw register value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    const fn is_set(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    /// Bridges are disabled.
    #[must_use]
    pub const fn is_hiz(self) -> bool {
        self.is_set(Self::HIZ)
    }

    /// A command is still executing.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !self.is_set(Self::BUSY)
    }

    /// Decoded `MOT_STATUS`.
    #[must_use]
    pub const fn motor_status(self) -> MotorStatus {
        match (self.0 & Self::MOT_STATUS) >> 5 {
            0 => MotorStatus::Stopped,
            1 => MotorStatus::Accelerating,
            2 => MotorStatus::Decelerating,
            _ => MotorStatus::ConstantSpeed,
        }
    }

    /// Alarm conditions flagged by this status.
    #[must_use]
    pub fn faults(self) -> FaultSet {
        let mut set = FaultSet::new();
        if !self.is_set(Self::OCD) {
            set.insert(FaultType::DriverOvercurrent);
        }
        if !self.is_set(Self::TH_SD) {
            set.insert(FaultType::DriverThermalShutdown);
        }
        if !self.is_set(Self::TH_WRN) {
            set.insert(FaultType::DriverThermalWarning);
        }
        if !self.is_set(Self::UVLO) {
            set.insert(FaultType::DriverUndervoltage);
        }
        if !self.is_set(Self::STEP_LOSS_A) || !self.is_set(Self::STEP_LOSS_B) {
            set.insert(FaultType::DriverStepLoss);
        }
        if self.is_set(Self::WRONG_CMD) || self.is_set(Self::NOTPERF_CMD) {
            set.insert(FaultType::DriverCommandError);
        }
        set
    }
}

impl fmt::Debug for L6470Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("L6470Status")
            .field("raw", &format_args!("{:#06X}", self.0))
            .field("hiz", &self.is_hiz())
            .field("motor", &self.motor_status())
            .field("faults", &self.faults())
            .finish()
    }
}

/// A chain of L6470 drivers sharing one chip select.
#[derive(Debug)]
pub struct L6470Chain<S: SpiBus> {
    spi: S,
    len: usize,
}

impl<S: SpiBus> L6470Chain<S> {
    /// Wrap `spi` for a chain of `len` drivers.
    ///
    /// # Errors
    ///
    /// Returns [`FaultError::ChainLength`] unless `1 <= len <= MAX_CHAIN_LEN`.
    pub fn new(spi: S, len: usize) -> FaultResult<Self> {
        if len == 0 || len > MAX_CHAIN_LEN {
            return Err(FaultError::ChainLength {
                len,
                max: MAX_CHAIN_LEN,
            });
        }
        Ok(Self { spi, len })
    }

    /// Number of drivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a chain has at least one driver.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn frame(&self, byte: u8) -> heapless::Vec<u8, MAX_CHAIN_LEN> {
        let mut frame = heapless::Vec::new();
        for _ in 0..self.len {
            if frame.push(byte).is_err() {
                break;
            }
        }
        frame
    }

    /// Send the same command to every driver in one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn broadcast(&mut self, command: Command) -> HalResult<()> {
        let frame = self.frame(command.opcode());
        self.spi.write(&frame)
    }

    /// Read (and thereby clear) every driver's STATUS register.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three frames failed.
    pub fn get_status(&mut self) -> HalResult<ChainStatus> {
        self.broadcast(Command::GetStatus)?;
        let mut msb = self.frame(Command::Nop.opcode());
        self.spi.transfer_in_place(&mut msb)?;
        let mut lsb = self.frame(Command::Nop.opcode());
        self.spi.transfer_in_place(&mut lsb)?;

        let mut statuses = ChainStatus::new();
        for (&hi, &lo) in msb.iter().zip(lsb.iter()) {
            if statuses.push(L6470Status::from_bytes(hi, lo)).is_err() {
                break;
            }
        }
        Ok(statuses)
    }

    /// `HARD_HIZ` to every driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn hard_hiz(&mut self) -> HalResult<()> {
        self.broadcast(Command::HardHiZ)
    }

    /// `SOFT_HIZ` to every driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn soft_hiz(&mut self) -> HalResult<()> {
        self.broadcast(Command::SoftHiZ)
    }

    /// `HARD_STOP` to every driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn hard_stop(&mut self) -> HalResult<()> {
        self.broadcast(Command::HardStop)
    }

    /// `SOFT_STOP` to every driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer failed.
    pub fn soft_stop(&mut self) -> HalResult<()> {
        self.broadcast(Command::SoftStop)
    }
}
