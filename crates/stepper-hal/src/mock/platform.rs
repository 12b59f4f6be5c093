use super::{MockClock, MockI2c, MockPin, MockSpi, MockWatchdog};
use crate::platform::{Platform, PlatformParts};
use crate::watchdog::WatchdogKind;

/// Platform made entirely of mocks.
///
/// Idle wiring matches the reference board: channel A is a normally-closed
/// loop (high when released), channel B is its complement (low when
/// released), the open-drain FLAG line idles high and STBY starts low.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPlatform {
    /// Watchdog peripheral to model.
    pub watchdog_kind: WatchdogKind,
    /// Hand out a second e-stop channel.
    pub dual_channel: bool,
    /// Hand out an encoder bus.
    pub encoder: bool,
}

/// Test-side handles to every mock peripheral in a [`PlatformParts`].
#[derive(Debug, Clone)]
pub struct MockHandles {
    /// E-stop channel A.
    pub estop_a: MockPin,
    /// E-stop channel B (present even when not handed out).
    pub estop_b: MockPin,
    /// Watchdog.
    pub watchdog: MockWatchdog,
    /// Motor SPI.
    pub motor_spi: MockSpi,
    /// Encoder I2C.
    pub encoder_i2c: MockI2c,
    /// Driver FLAG line.
    pub driver_flag: MockPin,
    /// Driver STBY/RST line.
    pub driver_standby: MockPin,
    /// Clock.
    pub clock: MockClock,
}

impl MockHandles {
    /// Press the e-stop on both channels.
    pub fn press_estop(&self) {
        self.estop_a.set_level(false);
        self.estop_b.set_level(true);
    }

    /// Release the e-stop on both channels.
    pub fn release_estop(&self) {
        self.estop_a.set_level(true);
        self.estop_b.set_level(false);
    }
}

impl Platform for MockPlatform {
    type EStopA = MockPin;
    type EStopB = MockPin;
    type Watchdog = MockWatchdog;
    type MotorSpi = MockSpi;
    type EncoderI2c = MockI2c;
    type DriverFlag = MockPin;
    type DriverStandby = MockPin;
    type Clock = MockClock;
}

impl MockPlatform {
    /// Dual-channel e-stop, IWDG and an encoder bus.
    #[must_use]
    pub fn standard() -> (PlatformParts<Self>, MockHandles) {
        Self {
            watchdog_kind: WatchdogKind::Independent,
            dual_channel: true,
            encoder: true,
        }
        .parts()
    }

    /// Build the parts and matching handles for this option set.
    #[must_use]
    pub fn parts(self) -> (PlatformParts<Self>, MockHandles) {
        let clock = MockClock::new();
        let handles = MockHandles {
            estop_a: MockPin::new(true),
            estop_b: MockPin::new(false),
            watchdog: MockWatchdog::new(self.watchdog_kind, clock.clone()),
            motor_spi: MockSpi::new(),
            encoder_i2c: MockI2c::new(),
            driver_flag: MockPin::new(true),
            driver_standby: MockPin::new(false),
            clock,
        };
        let parts = PlatformParts {
            estop_a: handles.estop_a.clone(),
            estop_b: self.dual_channel.then(|| handles.estop_b.clone()),
            watchdog: handles.watchdog.clone(),
            motor_spi: handles.motor_spi.clone(),
            encoder_i2c: self.encoder.then(|| handles.encoder_i2c.clone()),
            driver_flag: handles.driver_flag.clone(),
            driver_standby: handles.driver_standby.clone(),
            clock: handles.clock.clone(),
        };
        (parts, handles)
    }
}
