//! Board binding.

use crate::bus::{I2cBus, SpiBus};
use crate::clock::Clock;
use crate::gpio::{DigitalInput, DigitalOutput};
use crate::watchdog::WatchdogPeripheral;
use core::fmt;

/// One concrete set of peripherals for the safety core.
///
/// Implemented once per board (and once by the mock platform). The type is a
/// marker; the peripherals themselves travel in [`PlatformParts`].
pub trait Platform {
    /// Primary e-stop input (NC loop on the reference board).
    type EStopA: DigitalInput;
    /// Redundant e-stop input.
    type EStopB: DigitalInput;
    /// IWDG or WWDG.
    type Watchdog: WatchdogPeripheral;
    /// SPI device for the L6470 daisy chain.
    type MotorSpi: SpiBus;
    /// I2C controller the AS5600 encoder sits on.
    type EncoderI2c: I2cBus;
    /// Wired-OR L6470 FLAG line.
    type DriverFlag: DigitalInput;
    /// L6470 STBY/RST line. Low holds every driver in reset with bridges off.
    type DriverStandby: DigitalOutput;
    /// Monotonic time base.
    type Clock: Clock;
}

/// Owned peripherals handed to the safety system at start-up.
pub struct PlatformParts<P: Platform> {
    /// Primary e-stop channel.
    pub estop_a: P::EStopA,
    /// Redundant e-stop channel. `None` on single-channel wiring.
    pub estop_b: Option<P::EStopB>,
    /// Watchdog peripheral.
    pub watchdog: P::Watchdog,
    /// L6470 chain SPI device.
    pub motor_spi: P::MotorSpi,
    /// Encoder bus. `None` when no encoder is fitted.
    pub encoder_i2c: Option<P::EncoderI2c>,
    /// Driver FLAG input.
    pub driver_flag: P::DriverFlag,
    /// Driver standby/reset output.
    pub driver_standby: P::DriverStandby,
    /// Time base.
    pub clock: P::Clock,
}

impl<P: Platform> fmt::Debug for PlatformParts<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformParts")
            .field("dual_channel_estop", &self.estop_b.is_some())
            .field("encoder_fitted", &self.encoder_i2c.is_some())
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
