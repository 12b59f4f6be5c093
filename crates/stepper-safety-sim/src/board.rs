//! A simulated board: mock peripherals, device models and a main loop.

use crate::error::{SimError, SimResult};
use core::time::Duration;
use stepper_fault_monitor::sim::{L6470Sim, attach_as5600, set_magnet};
use stepper_fault_monitor::{L6470Status, MagnetStatus};
use stepper_hal::mock::{MockHandles, MockPlatform};
use stepper_safety::{SafetyConfig, SafetyState, SafetyStatus, SafetySystem};

/// Main-loop period of the simulated firmware.
pub const TICK: Duration = Duration::from_millis(1);

/// A [`SafetySystem`] on mock peripherals with scripted drivers and encoder.
#[derive(Debug)]
pub struct SimBoard {
    system: SafetySystem<MockPlatform>,
    handles: MockHandles,
    drivers: L6470Sim,
    left_safe: bool,
}

impl SimBoard {
    /// Boot a board. `watchdog_reset` pretends the previous MCU reset came
    /// from the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the safety system refuses the configuration.
    pub fn boot(config: SafetyConfig, watchdog_reset: bool) -> SimResult<Self> {
        let (parts, handles) = MockPlatform::standard();
        let drivers = L6470Sim::new(usize::from(config.motor_count));
        drivers.attach(&handles.motor_spi);
        attach_as5600(&handles.encoder_i2c, MagnetStatus::NOMINAL);
        handles.watchdog.set_reset_flag(watchdog_reset);

        let system = SafetySystem::new(parts, config).map_err(|e| SimError::safety("boot", e))?;
        let left_safe = system.state() != SafetyState::Safe;
        Ok(Self {
            system,
            handles,
            drivers,
            left_safe,
        })
    }

    /// Run the main loop for `ms` milliseconds, kicking the watchdog each pass.
    ///
    /// # Errors
    ///
    /// Returns the first tick error.
    pub fn run(&mut self, step: &'static str, ms: u64) -> SimResult<SafetyStatus> {
        self.advance(step, ms, true)
    }

    /// Run with a hung application: ticks continue, kicks do not.
    ///
    /// # Errors
    ///
    /// Returns the first tick error.
    pub fn run_hung(&mut self, step: &'static str, ms: u64) -> SimResult<SafetyStatus> {
        self.advance(step, ms, false)
    }

    fn advance(&mut self, step: &'static str, ms: u64, kick: bool) -> SimResult<SafetyStatus> {
        let mut status = self.system.status();
        for _ in 0..ms {
            self.handles.clock.advance(TICK);
            if kick {
                self.system.kick_watchdog();
            }
            status = self.system.tick().map_err(|e| SimError::safety(step, e))?;
            self.left_safe |= status.state != SafetyState::Safe;
        }
        Ok(status)
    }

    /// Fail unless the system is in `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnexpectedState`] on mismatch.
    pub fn expect_state(&self, step: &'static str, expected: SafetyState) -> SimResult<()> {
        let actual = self.system.state();
        if actual != expected {
            tracing::error!(step, expected = %expected, actual = %actual, "unexpected state");
            return Err(SimError::UnexpectedState {
                step,
                expected,
                actual,
            });
        }
        tracing::debug!(step, state = %actual, "checkpoint");
        Ok(())
    }

    /// Fail with `what` unless `holds`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Expectation`] when `holds` is false.
    pub fn expect(&self, step: &'static str, holds: bool, what: &'static str) -> SimResult<()> {
        if holds {
            Ok(())
        } else {
            tracing::error!(step, what, "expectation failed");
            Err(SimError::Expectation { step, what })
        }
    }

    /// Press both e-stop channels.
    pub fn press_estop(&self) {
        self.handles.press_estop();
    }

    /// Release both e-stop channels.
    pub fn release_estop(&self) {
        self.handles.release_estop();
    }

    /// Drive only channel B to its active level.
    pub fn press_channel_b_only(&self) {
        self.handles.estop_b.set_level(true);
    }

    /// Script an overcurrent alarm on `driver`.
    pub fn overcurrent(&self, driver: usize) {
        self.drivers.set_status(
            driver,
            L6470Status(L6470Status::IDLE.raw() & !L6470Status::OCD),
        );
    }

    /// Clear every scripted driver alarm.
    pub fn drivers_idle(&self) {
        self.drivers.set_all(L6470Status::IDLE);
    }

    /// Change the encoder's magnet status.
    pub fn set_magnet(&self, status: MagnetStatus) {
        set_magnet(&self.handles.encoder_i2c, status);
    }

    /// STBY/RST is high.
    #[must_use]
    pub fn drivers_enabled(&self) -> bool {
        self.handles.driver_standby.level()
    }

    /// The hardware watchdog would have reset the MCU.
    #[must_use]
    pub fn watchdog_expired(&self) -> bool {
        self.handles.watchdog.expired()
    }

    /// The system has been in a state other than `Safe` at some point.
    #[must_use]
    pub fn left_safe(&self) -> bool {
        self.left_safe
    }

    /// The safety system under test.
    #[must_use]
    pub fn system(&self) -> &SafetySystem<MockPlatform> {
        &self.system
    }

    /// Mutable access for operator requests.
    pub fn system_mut(&mut self) -> &mut SafetySystem<MockPlatform> {
        &mut self.system
    }

    /// Milliseconds since boot.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.system.now().as_millis()).unwrap_or(u64::MAX)
    }
}
