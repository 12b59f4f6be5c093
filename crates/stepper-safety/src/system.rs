//! The safety system: one owner for every safety component.

use crate::config::SafetyConfig;
use crate::error::{SafetyError, SafetyResult};
use crate::event::{EventLog, SafetyEventKind};
use crate::shutdown::{DriverShutdown, MotorShutdown};
use crate::state::SafetyState;
use crate::status::{SafetyStatus, SharedSafetyStatus};
use core::fmt;
use stepper_estop::{EStopEvent, EmergencyStop, TriggerSource};
use stepper_fault_monitor::{
    As5600, FaultAction, FaultEvent, FaultMonitor, FaultSeverity, FaultSource, FaultType,
    L6470Chain,
};
use stepper_hal::{Clock, Platform, PlatformParts, Timestamp};
use stepper_watchdog::{WatchdogManager, WatchdogTick};

/// Keep the first error of a tick while the remaining steps still run.
fn note(first: &mut Option<SafetyError>, result: SafetyResult<()>) {
    if let Err(err) = result {
        first.get_or_insert(err);
    }
}

/// Safety state machine over one board's peripherals.
///
/// Call [`tick`](Self::tick) from the main loop at least once per fault poll
/// interval, and [`kick_watchdog`](Self::kick_watchdog) once per loop
/// iteration that completed normally.
pub struct SafetySystem<P: Platform> {
    config: SafetyConfig,
    clock: P::Clock,
    estop: EmergencyStop<P::EStopA, P::EStopB>,
    watchdog: WatchdogManager<P::Watchdog>,
    monitor: FaultMonitor,
    shutdown: DriverShutdown<P::MotorSpi, P::DriverStandby>,
    encoder: Option<As5600<P::EncoderI2c>>,
    driver_flag: P::DriverFlag,
    state: SafetyState,
    state_since: Timestamp,
    started_at: Timestamp,
    events: EventLog,
    shared: SharedSafetyStatus,
}

impl<P: Platform> SafetySystem<P> {
    /// Take ownership of the peripherals, start the watchdog and enter the
    /// initial state.
    ///
    /// The drivers are held in standby until the system is `Safe`. After a
    /// watchdog reset the system starts in `Fault` with
    /// [`FaultType::WatchdogReset`] active, which has to be acknowledged.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a peripheral could
    /// not be set up.
    pub fn new(parts: PlatformParts<P>, config: SafetyConfig) -> SafetyResult<Self> {
        config.validate()?;
        let PlatformParts {
            estop_a,
            estop_b,
            watchdog,
            motor_spi,
            encoder_i2c,
            driver_flag,
            driver_standby,
            clock,
        } = parts;
        let now = clock.now();

        let estop = EmergencyStop::new(estop_a, estop_b, config.estop)?;
        let mut watchdog = WatchdogManager::new(watchdog, config.watchdog)?;
        let mut monitor = FaultMonitor::new(config.faults)?;
        let chain = L6470Chain::new(motor_spi, usize::from(config.motor_count))?;
        let mut shutdown = DriverShutdown::new(chain, driver_standby);
        shutdown.hold_in_standby()?;
        monitor.set_drivers_powered(false);

        let reset_by_watchdog = watchdog.reset_caused_by_watchdog();
        watchdog.start(now)?;

        let mut system = Self {
            config,
            clock,
            estop,
            watchdog,
            monitor,
            shutdown,
            encoder: encoder_i2c.map(As5600::new),
            driver_flag,
            state: SafetyState::Safe,
            state_since: now,
            started_at: now,
            events: EventLog::new(),
            shared: SharedSafetyStatus::new(),
        };

        if reset_by_watchdog {
            if let Some(event) =
                system
                    .monitor
                    .raise(FaultType::WatchdogReset, FaultSource::Watchdog, now)
            {
                system.record_fault_event(event, now);
            }
            system.transition(SafetyState::Fault, now)?;
        } else {
            system.power_up_drivers()?;
        }

        tracing::info!(
            state = %system.state,
            motors = config.motor_count,
            dual_channel = config.estop.dual_channel,
            encoder = system.encoder.is_some(),
            "safety system started"
        );
        system.publish(now);
        Ok(system)
    }

    /// Run one bounded iteration: e-stop, watchdog, fault poll, state
    /// evaluation, publication.
    ///
    /// Every step runs even if an earlier one failed; the status is always
    /// published.
    ///
    /// # Errors
    ///
    /// Returns the first error of the iteration.
    pub fn tick(&mut self) -> SafetyResult<SafetyStatus> {
        let now = self.clock.now();
        let mut first_error = None;

        if let EStopEvent::Triggered(source) = self.estop.poll(now) {
            note(&mut first_error, self.on_estop_triggered(source, now));
        }

        match self.watchdog.service(now) {
            Ok(tick) => note(&mut first_error, self.on_watchdog_tick(tick, now)),
            Err(err) => note(&mut first_error, Err(err.into())),
        }

        let report = self.monitor.poll(
            self.shutdown.chain_mut(),
            self.encoder.as_mut(),
            &mut self.driver_flag,
            now,
        );
        for event in report.raised.into_iter().chain(report.cleared) {
            note(&mut first_error, self.on_fault_event(event, now));
        }

        note(&mut first_error, self.evaluate(now));

        let status = self.publish(now);
        match first_error {
            Some(err) => Err(err),
            None => Ok(status),
        }
    }

    /// Software e-stop from the communication layer.
    ///
    /// # Errors
    ///
    /// Returns an error if emergency disable could not complete.
    pub fn request_emergency_stop(&mut self, source: TriggerSource) -> SafetyResult<()> {
        let now = self.clock.now();
        let result = match self.estop.trigger(source, now) {
            EStopEvent::Triggered(source) => self.on_estop_triggered(source, now),
            EStopEvent::None | EStopEvent::Released | EStopEvent::ResetAccepted => Ok(()),
        };
        self.publish(now);
        result
    }

    /// Ask to leave `Fault` or `EmergencyStop`.
    ///
    /// On success the system enters `Recovery`; motion is allowed again once
    /// `recovery_hold_ms` passes without a critical fault or e-stop.
    ///
    /// # Errors
    ///
    /// Refused when there is nothing to recover from, the watchdog is not
    /// healthy, a latched fault cannot be cleared yet, or the e-stop refuses
    /// its reset. Nothing changes on refusal.
    pub fn request_recovery(&mut self) -> SafetyResult<()> {
        let now = self.clock.now();
        let result = self.begin_recovery(now);
        if let Err(err) = &result {
            tracing::warn!(error = %err, state = %self.state, "recovery refused");
        }
        self.publish(now);
        result
    }

    fn begin_recovery(&mut self, now: Timestamp) -> SafetyResult<()> {
        if !matches!(self.state, SafetyState::Fault | SafetyState::EmergencyStop) {
            return Err(SafetyError::NothingToRecover(self.state));
        }
        if !self.watchdog.is_healthy() {
            return Err(SafetyError::WatchdogUnhealthy);
        }
        let observed = self.monitor.observed();
        if let Some(fault) = self.monitor.active().iter().find(|fault| {
            fault.severity().is_latching() && (!fault.is_recoverable() || observed.contains(*fault))
        }) {
            return Err(SafetyError::FaultsRemain(fault));
        }

        if self.estop.is_triggered() {
            self.estop.request_reset(now)?;
            self.events.push(now, SafetyEventKind::EStopReset);
        }
        for event in self.monitor.clear_all_recoverable(now) {
            self.record_fault_event(event, now);
        }
        self.transition(SafetyState::Recovery, now)?;
        self.events.push(now, SafetyEventKind::RecoveryStarted);
        Ok(())
    }

    /// Clear [`FaultType::WatchdogReset`] after the operator has seen it.
    ///
    /// # Errors
    ///
    /// Returns an error if the fault is not active.
    pub fn acknowledge_watchdog_reset(&mut self) -> SafetyResult<()> {
        let now = self.clock.now();
        let event = self.monitor.acknowledge(FaultType::WatchdogReset, now)?;
        self.record_fault_event(event, now);
        tracing::info!("watchdog reset acknowledged");
        self.publish(now);
        Ok(())
    }

    /// Raise a fault detected outside the safety core.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting shutdown could not complete.
    pub fn report_fault(&mut self, fault: FaultType) -> SafetyResult<()> {
        let now = self.clock.now();
        let mut first_error = None;
        if let Some(event) = self
            .monitor
            .report_external(fault, FaultSource::External, now)
        {
            note(&mut first_error, self.on_fault_event(event, now));
        }
        note(&mut first_error, self.evaluate(now));
        self.publish(now);
        first_error.map_or(Ok(()), Err)
    }

    /// Decelerate every motor to a stop. Does not change the safety state.
    ///
    /// # Errors
    ///
    /// Returns an error if the stop could not be commanded.
    pub fn controlled_stop(&mut self) -> SafetyResult<()> {
        self.shutdown.controlled_stop()?;
        tracing::info!("controlled stop commanded");
        Ok(())
    }

    /// Main-loop liveness check-in.
    pub fn kick_watchdog(&mut self) {
        self.watchdog.kick();
    }

    fn on_estop_triggered(&mut self, source: TriggerSource, now: Timestamp) -> SafetyResult<()> {
        self.events.push(now, SafetyEventKind::EStopTriggered(source));
        if source == TriggerSource::ChannelMismatch
            && let Some(event) = self.monitor.raise(
                FaultType::EStopChannelMismatch,
                FaultSource::EmergencyStop,
                now,
            )
        {
            self.record_fault_event(event, now);
        }
        if self.state == SafetyState::EmergencyStop {
            return Ok(());
        }
        let disabled = self.emergency_disable(now);
        self.transition(SafetyState::EmergencyStop, now)?;
        disabled
    }

    fn emergency_disable(&mut self, detected_at: Timestamp) -> SafetyResult<()> {
        let result = self.shutdown.emergency_disable();
        self.monitor.set_drivers_powered(false);

        let completed = self.clock.now();
        let check = self.estop.record_response(detected_at, completed);
        self.events.push(
            completed,
            SafetyEventKind::ResponseMeasured {
                micros: check.micros,
                within_budget: check.within_budget,
            },
        );
        if !check.within_budget
            && let Some(event) = self.monitor.raise(
                FaultType::EStopResponseOverrun,
                FaultSource::EmergencyStop,
                completed,
            )
        {
            self.record_fault_event(event, completed);
        }

        if let Err(err) = result {
            tracing::error!(error = %err, "emergency disable incomplete");
            return Err(err.into());
        }
        Ok(())
    }

    fn on_watchdog_tick(&mut self, tick: WatchdogTick, now: Timestamp) -> SafetyResult<()> {
        let fault = match tick {
            WatchdogTick::Idle
            | WatchdogTick::Refreshed
            | WatchdogTick::Deferred
            | WatchdogTick::Inhibited => return Ok(()),
            WatchdogTick::Missed { consecutive } => {
                self.events.push(now, SafetyEventKind::WatchdogMissed(consecutive));
                FaultType::WatchdogLateRefresh
            }
            WatchdogTick::Starved { consecutive } => {
                self.events.push(now, SafetyEventKind::WatchdogMissed(consecutive));
                FaultType::WatchdogStarvation
            }
            WatchdogTick::Expired => {
                return match self.estop.trigger(TriggerSource::Fault, now) {
                    EStopEvent::Triggered(source) => {
                        tracing::error!("watchdog expired, hardware reset imminent");
                        self.on_estop_triggered(source, now)
                    }
                    EStopEvent::None | EStopEvent::Released | EStopEvent::ResetAccepted => Ok(()),
                };
            }
        };
        match self.monitor.raise(fault, FaultSource::Watchdog, now) {
            Some(event) => self.on_fault_event(event, now),
            None => Ok(()),
        }
    }

    fn on_fault_event(&mut self, event: FaultEvent, now: Timestamp) -> SafetyResult<()> {
        self.record_fault_event(event, now);
        if let FaultEvent::Raised { fault, .. } = event
            && fault.severity() == FaultSeverity::Emergency
            && let EStopEvent::Triggered(source) = self.estop.trigger(TriggerSource::Fault, now)
        {
            return self.on_estop_triggered(source, now);
        }
        Ok(())
    }

    fn record_fault_event(&mut self, event: FaultEvent, now: Timestamp) {
        self.events.push(now, event.into());
    }

    fn evaluate(&mut self, now: Timestamp) -> SafetyResult<()> {
        let severity = self.monitor.highest_severity();
        let critical = severity.is_some_and(FaultSeverity::is_latching);

        let target = match self.state {
            _ if self.estop.is_triggered() => SafetyState::EmergencyStop,
            SafetyState::EmergencyStop | SafetyState::Fault => self.state,
            SafetyState::Recovery if critical => {
                if let Some(fault) = self.latching_fault() {
                    self.events.push(now, SafetyEventKind::RecoveryAborted(fault));
                }
                SafetyState::Fault
            }
            SafetyState::Recovery => {
                if now.saturating_sub(self.state_since) < self.config.recovery_hold() {
                    SafetyState::Recovery
                } else if severity.is_some() {
                    SafetyState::Warning
                } else {
                    SafetyState::Safe
                }
            }
            SafetyState::Safe | SafetyState::Warning => match severity {
                None => SafetyState::Safe,
                Some(FaultSeverity::Warning) => SafetyState::Warning,
                Some(FaultSeverity::Critical | FaultSeverity::Emergency) => SafetyState::Fault,
            },
        };

        if target == self.state {
            return Ok(());
        }
        self.enter(target, now)
    }

    fn latching_fault(&self) -> Option<FaultType> {
        self.monitor
            .active()
            .iter()
            .filter(|fault| fault.severity().is_latching())
            .max_by_key(|fault| fault.severity())
    }

    fn enter(&mut self, to: SafetyState, now: Timestamp) -> SafetyResult<()> {
        let from = self.state;
        self.transition(to, now)?;
        match to {
            SafetyState::Fault => {
                let action = self
                    .monitor
                    .active()
                    .strongest_action()
                    .unwrap_or(FaultAction::HardStop);
                if action == FaultAction::EmergencyStop {
                    self.emergency_disable(now)
                } else if self.shutdown.outputs_enabled() {
                    tracing::warn!(action = ?action, "fault shutdown");
                    self.shutdown.apply(action).map_err(SafetyError::from)
                } else {
                    Ok(())
                }
            }
            SafetyState::EmergencyStop => self.emergency_disable(now),
            SafetyState::Safe | SafetyState::Warning if from == SafetyState::Recovery => {
                self.power_up_drivers()
            }
            SafetyState::Safe | SafetyState::Warning | SafetyState::Recovery => Ok(()),
        }
    }

    fn transition(&mut self, to: SafetyState, now: Timestamp) -> SafetyResult<()> {
        let from = self.state;
        if !from.can_transition_to(to) {
            tracing::error!(from = %from, to = %to, "safety state transition rejected");
            return Err(SafetyError::InvalidTransition { from, to });
        }
        self.state = to;
        self.state_since = now;
        self.events.push(now, SafetyEventKind::StateChanged { from, to });
        match to {
            SafetyState::Safe | SafetyState::Recovery => {
                tracing::info!(from = %from, to = %to, "safety state changed");
            }
            SafetyState::Warning => {
                tracing::warn!(from = %from, to = %to, "safety state changed");
            }
            SafetyState::Fault | SafetyState::EmergencyStop => {
                tracing::error!(
                    from = %from,
                    to = %to,
                    faults = ?self.monitor.active(),
                    "safety state changed"
                );
            }
        }
        Ok(())
    }

    fn power_up_drivers(&mut self) -> SafetyResult<()> {
        self.shutdown.enable_outputs()?;
        self.monitor.set_drivers_powered(true);
        Ok(())
    }

    fn snapshot(&self, now: Timestamp) -> SafetyStatus {
        let stats = self.estop.stats();
        let highest_severity = self.monitor.highest_severity();
        let estop_triggered = self.estop.is_triggered();
        SafetyStatus {
            state: self.state,
            active_faults: self.monitor.active(),
            highest_severity,
            estop_triggered,
            motion_permitted: self.state.permits_motion()
                && !estop_triggered
                && !highest_severity.is_some_and(FaultSeverity::is_latching)
                && self.shutdown.outputs_enabled(),
            watchdog_status: self.watchdog.status(),
            last_response_us: stats.last_response_us,
            worst_response_us: stats.worst_response_us,
            uptime: now.saturating_sub(self.started_at),
        }
    }

    fn publish(&self, now: Timestamp) -> SafetyStatus {
        let status = self.snapshot(now);
        self.shared.publish(&status);
        status
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> SafetyStatus {
        self.snapshot(self.clock.now())
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SafetyState {
        self.state
    }

    /// Event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Lock-free status for other tasks.
    #[must_use]
    pub fn shared(&self) -> &SharedSafetyStatus {
        &self.shared
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// The e-stop handler.
    #[must_use]
    pub fn estop(&self) -> &EmergencyStop<P::EStopA, P::EStopB> {
        &self.estop
    }

    /// The watchdog manager.
    #[must_use]
    pub fn watchdog(&self) -> &WatchdogManager<P::Watchdog> {
        &self.watchdog
    }

    /// The fault monitor.
    #[must_use]
    pub fn monitor(&self) -> &FaultMonitor {
        &self.monitor
    }

    /// The driver shutdown path.
    #[must_use]
    pub fn shutdown(&self) -> &DriverShutdown<P::MotorSpi, P::DriverStandby> {
        &self.shutdown
    }

    /// Current time on the system clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl<P: Platform> fmt::Debug for SafetySystem<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetySystem")
            .field("state", &self.state)
            .field("state_since", &self.state_since)
            .field("estop", &self.estop.state())
            .field("watchdog", &self.watchdog.status())
            .field("faults", &self.monitor.active())
            .field("outputs_enabled", &self.shutdown.outputs_enabled())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
