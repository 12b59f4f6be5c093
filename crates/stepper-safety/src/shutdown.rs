//! Motor shutdown paths.

use stepper_fault_monitor::{FaultAction, L6470Chain};
use stepper_hal::{DigitalOutput, HalResult, SpiBus};

/// Something that can take the motors out of service.
pub trait MotorShutdown {
    /// Fastest path to unpowered motors. Must not wait on the motion.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Implementations still attempt every
    /// remaining step after a failure.
    fn emergency_disable(&mut self) -> HalResult<()>;

    /// Decelerate and hold.
    ///
    /// # Errors
    ///
    /// Returns an error if the stop could not be commanded.
    fn controlled_stop(&mut self) -> HalResult<()>;
}

/// Shutdown through the L6470 chain and the shared STBY/RST line.
#[derive(Debug)]
pub struct DriverShutdown<S: SpiBus, P: DigitalOutput> {
    chain: L6470Chain<S>,
    standby: P,
    outputs_enabled: bool,
}

impl<S: SpiBus, P: DigitalOutput> DriverShutdown<S, P> {
    /// Wrap the chain and the standby output. Outputs are assumed disabled.
    #[must_use]
    pub fn new(chain: L6470Chain<S>, standby: P) -> Self {
        Self {
            chain,
            standby,
            outputs_enabled: false,
        }
    }

    /// Release the drivers from standby.
    ///
    /// # Errors
    ///
    /// Returns an error if the standby line could not be driven.
    pub fn enable_outputs(&mut self) -> HalResult<()> {
        self.standby.set_high()?;
        self.outputs_enabled = true;
        tracing::info!(drivers = self.chain.len(), "motor drivers enabled");
        Ok(())
    }

    /// Hold the drivers in standby without commanding the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the standby line could not be driven.
    pub fn hold_in_standby(&mut self) -> HalResult<()> {
        self.outputs_enabled = false;
        self.standby.set_low()
    }

    /// Carry out a fault action. `EmergencyStop` runs
    /// [`emergency_disable`](MotorShutdown::emergency_disable).
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be sent.
    pub fn apply(&mut self, action: FaultAction) -> HalResult<()> {
        match action {
            FaultAction::LogOnly => Ok(()),
            FaultAction::HardStop => self.chain.hard_stop(),
            FaultAction::HardHiZ => self.chain.hard_hiz(),
            FaultAction::EmergencyStop => self.emergency_disable(),
        }
    }

    /// Whether the drivers are out of standby.
    #[must_use]
    pub fn outputs_enabled(&self) -> bool {
        self.outputs_enabled
    }

    /// Mutable driver chain, for status polling.
    pub fn chain_mut(&mut self) -> &mut L6470Chain<S> {
        &mut self.chain
    }
}

impl<S: SpiBus, P: DigitalOutput> MotorShutdown for DriverShutdown<S, P> {
    /// `HARD_HIZ` to every driver, then STBY/RST low.
    fn emergency_disable(&mut self) -> HalResult<()> {
        let bridges = self.chain.hard_hiz();
        let standby = self.standby.set_low();
        self.outputs_enabled = false;
        bridges.and(standby)
    }

    /// `SOFT_STOP` to every driver.
    fn controlled_stop(&mut self) -> HalResult<()> {
        self.chain.soft_stop()
    }
}
