//! Mock board shared by the integration tests.

use stepper_fault_monitor::sim::{L6470Sim, attach_as5600};
use stepper_fault_monitor::{L6470Status, MagnetStatus};
use stepper_hal::mock::{MockHandles, MockPlatform};
use stepper_safety::prelude::*;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A booted safety system on mock peripherals, with idle drivers and a
/// nominal encoder magnet.
#[derive(Debug)]
pub struct Board {
    pub system: SafetySystem<MockPlatform>,
    pub handles: MockHandles,
    pub drivers: L6470Sim,
}

impl Board {
    pub fn boot() -> SafetyResult<Self> {
        Self::boot_with(SafetyConfig::default(), false)
    }

    /// Boot with `config`, optionally as if the watchdog reset the MCU.
    pub fn boot_with(config: SafetyConfig, watchdog_reset: bool) -> SafetyResult<Self> {
        let (parts, handles) = MockPlatform::standard();
        let drivers = L6470Sim::new(usize::from(config.motor_count));
        drivers.attach(&handles.motor_spi);
        attach_as5600(&handles.encoder_i2c, MagnetStatus::NOMINAL);
        handles.watchdog.set_reset_flag(watchdog_reset);
        let system = SafetySystem::new(parts, config)?;
        Ok(Self {
            system,
            handles,
            drivers,
        })
    }

    /// Advance `ms` milliseconds: one tick per millisecond, watchdog kicked.
    pub fn run(&mut self, ms: u64) -> SafetyResult<SafetyStatus> {
        self.step(ms, true)
    }

    /// Advance `ms` milliseconds with a hung main loop.
    pub fn run_unkicked(&mut self, ms: u64) -> SafetyResult<SafetyStatus> {
        self.step(ms, false)
    }

    fn step(&mut self, ms: u64, kick: bool) -> SafetyResult<SafetyStatus> {
        let mut status = self.system.status();
        for _ in 0..ms {
            self.handles.clock.advance_ms(1);
            if kick {
                self.system.kick_watchdog();
            }
            status = self.system.tick()?;
        }
        Ok(status)
    }

    /// Script an overcurrent alarm on one driver.
    pub fn overcurrent(&self, driver: usize) {
        self.drivers.set_status(
            driver,
            L6470Status(L6470Status::IDLE.raw() & !L6470Status::OCD),
        );
    }

    /// Every driver back to idle with no alarms.
    pub fn drivers_idle(&self) {
        self.drivers.set_all(L6470Status::IDLE);
    }

    pub fn set_magnet(&self, status: MagnetStatus) {
        stepper_fault_monitor::sim::set_magnet(&self.handles.encoder_i2c, status);
    }

    /// Retained event kinds, oldest first.
    pub fn event_kinds(&self) -> Vec<SafetyEventKind> {
        self.system.events().iter().map(|event| event.kind).collect()
    }

    /// Retained state changes, oldest first.
    pub fn transitions(&self) -> Vec<(SafetyState, SafetyState)> {
        self.system
            .events()
            .iter()
            .filter_map(|event| match event.kind {
                SafetyEventKind::StateChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    /// STBY/RST is high, i.e. the bridges may be driven.
    pub fn drivers_out_of_standby(&self) -> bool {
        self.handles.driver_standby.level()
    }
}
