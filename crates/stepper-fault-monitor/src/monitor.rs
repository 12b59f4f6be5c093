//! Fault classification and latching.

use crate::as5600::{As5600, MagnetStatus};
use crate::error::{FaultError, FaultResult};
use crate::faults::{FaultRecord, FaultSet, FaultSeverity, FaultSource, FaultThresholds, FaultType};
use crate::l6470::{L6470Chain, L6470Status, MAX_CHAIN_LEN};
use core::time::Duration;
use stepper_hal::{ActiveLevel, DigitalInput, HalResult, I2cBus, SpiBus, Timestamp};

/// Capacity of the fault record table.
pub const MAX_RECORDS: usize = 32;

/// Most events carried in one list of a [`PollReport`].
pub const MAX_REPORTED: usize = 16;

/// The L6470 FLAG output is open drain, pulled low on alarm.
pub const FLAG_ACTIVE_LEVEL: ActiveLevel = ActiveLevel::Low;

/// A fault edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FaultEvent {
    /// The fault went from inactive to active.
    Raised {
        /// The fault.
        fault: FaultType,
        /// Where it was detected.
        source: FaultSource,
        /// When.
        at: Timestamp,
    },
    /// The fault went from active to inactive.
    Cleared {
        /// The fault.
        fault: FaultType,
        /// When.
        at: Timestamp,
    },
}

impl FaultEvent {
    /// The fault this event is about.
    #[must_use]
    pub fn fault(&self) -> FaultType {
        match self {
            FaultEvent::Raised { fault, .. } | FaultEvent::Cleared { fault, .. } => *fault,
        }
    }
}

/// Bounded list of fault events.
pub type FaultEvents = heapless::Vec<FaultEvent, MAX_REPORTED>;

/// Result of one [`FaultMonitor::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Whether the devices were actually read this time.
    pub polled: bool,
    /// Faults that became active.
    pub raised: FaultEvents,
    /// Faults that cleared on their own.
    pub cleared: FaultEvents,
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultStatistics {
    /// Device polls performed.
    pub polls: u64,
    /// Inactive-to-active edges.
    pub faults_raised: u64,
    /// Active-to-inactive edges.
    pub faults_cleared: u64,
    /// Failed SPI status reads, per driver.
    pub spi_errors: u64,
    /// Failed encoder reads.
    pub i2c_errors: u64,
    /// Failed FLAG samples.
    pub flag_read_errors: u64,
}

fn push_event(events: &mut FaultEvents, event: FaultEvent) {
    if events.push(event).is_err() {
        tracing::debug!(fault = %event.fault(), "fault report full, event dropped");
    }
}

fn merge(into: &mut FaultEvents, from: FaultEvents) {
    for event in from {
        push_event(into, event);
    }
}

fn driver_source(index: usize) -> FaultSource {
    FaultSource::Driver(u8::try_from(index).unwrap_or(u8::MAX))
}

/// Classifies observations into latched faults.
///
/// Warnings clear themselves once their condition has been absent for
/// `warning_clear_ms`. Critical and emergency faults stay active until
/// [`clear`](Self::clear) or [`clear_all_recoverable`](Self::clear_all_recoverable),
/// and neither succeeds while the condition is still observed.
#[derive(Debug)]
pub struct FaultMonitor {
    thresholds: FaultThresholds,
    records: heapless::Vec<FaultRecord, MAX_RECORDS>,
    active: FaultSet,
    driver_faults: [FaultSet; MAX_CHAIN_LEN],
    spi_streak: [u32; MAX_CHAIN_LEN],
    spi_failing: [bool; MAX_CHAIN_LEN],
    encoder_faults: FaultSet,
    i2c_streak: u32,
    flag_streak: u32,
    drivers_powered: bool,
    last_poll: Option<Timestamp>,
    stats: FaultStatistics,
}

impl FaultMonitor {
    /// Create a monitor with no active faults.
    ///
    /// # Errors
    ///
    /// Returns an error if the thresholds are invalid.
    pub fn new(thresholds: FaultThresholds) -> FaultResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            records: heapless::Vec::new(),
            active: FaultSet::new(),
            driver_faults: [FaultSet::EMPTY; MAX_CHAIN_LEN],
            spi_streak: [0; MAX_CHAIN_LEN],
            spi_failing: [false; MAX_CHAIN_LEN],
            encoder_faults: FaultSet::new(),
            i2c_streak: 0,
            flag_streak: 0,
            drivers_powered: true,
            last_poll: None,
            stats: FaultStatistics::default(),
        })
    }

    /// Conditions currently being observed on the hardware.
    #[must_use]
    pub fn observed(&self) -> FaultSet {
        let mut set = self
            .driver_faults
            .iter()
            .fold(self.encoder_faults, |acc, faults| acc.union(*faults));
        if self.spi_failing.iter().any(|failing| *failing) {
            set.insert(FaultType::MotorSpiFailure);
        }
        if self.flag_streak >= self.thresholds.flag_debounce_samples {
            set.insert(FaultType::DriverFlagAsserted);
        }
        set
    }

    /// Mark a fault active. Returns an event only on the inactive-to-active
    /// edge; repeated calls just refresh `last_seen`.
    pub fn raise(
        &mut self,
        fault: FaultType,
        source: FaultSource,
        now: Timestamp,
    ) -> Option<FaultEvent> {
        let newly_active = self.active.insert(fault);
        match self.records.iter_mut().find(|record| record.fault == fault) {
            Some(record) => {
                record.last_seen = now;
                record.source = source;
                if newly_active {
                    record.active = true;
                    record.occurrences = record.occurrences.saturating_add(1);
                }
            }
            None => {
                if self.records.push(FaultRecord::new(fault, source, now)).is_err() {
                    tracing::error!(fault = %fault, "fault record table full");
                }
            }
        }
        if !newly_active {
            return None;
        }

        self.stats.faults_raised = self.stats.faults_raised.saturating_add(1);
        match fault.severity() {
            FaultSeverity::Warning => {
                tracing::warn!(fault = %fault, source = %source, "fault raised");
            }
            severity @ (FaultSeverity::Critical | FaultSeverity::Emergency) => {
                tracing::error!(
                    fault = %fault,
                    source = %source,
                    severity = %severity,
                    action = ?fault.default_action(),
                    "fault raised"
                );
            }
        }
        Some(FaultEvent::Raised {
            fault,
            source,
            at: now,
        })
    }

    /// Raise a fault detected by another subsystem.
    pub fn report_external(
        &mut self,
        fault: FaultType,
        source: FaultSource,
        now: Timestamp,
    ) -> Option<FaultEvent> {
        self.raise(fault, source, now)
    }

    fn raise_all(&mut self, faults: FaultSet, source: FaultSource, now: Timestamp) -> FaultEvents {
        let mut events = FaultEvents::new();
        for fault in faults {
            if let Some(event) = self.raise(fault, source, now) {
                push_event(&mut events, event);
            }
        }
        events
    }

    /// Feed one driver's status read.
    pub fn observe_driver(
        &mut self,
        index: usize,
        status: HalResult<L6470Status>,
        now: Timestamp,
    ) -> FaultEvents {
        let limit = self.thresholds.spi_max_consecutive_errors;
        let (Some(streak), Some(failing), Some(faults)) = (
            self.spi_streak.get_mut(index),
            self.spi_failing.get_mut(index),
            self.driver_faults.get_mut(index),
        ) else {
            tracing::debug!(index, "driver index outside the chain");
            return FaultEvents::new();
        };

        match status {
            Ok(status) => {
                *streak = 0;
                *failing = false;
                *faults = status.faults();
                let observed = *faults;
                self.raise_all(observed, driver_source(index), now)
            }
            Err(err) => {
                *streak = streak.saturating_add(1);
                self.stats.spi_errors = self.stats.spi_errors.saturating_add(1);
                tracing::debug!(index, error = %err, streak = *streak, "driver status read failed");
                if *streak < limit {
                    return FaultEvents::new();
                }
                *failing = true;
                *faults = FaultSet::EMPTY;
                let mut events = FaultEvents::new();
                if let Some(event) =
                    self.raise(FaultType::MotorSpiFailure, driver_source(index), now)
                {
                    push_event(&mut events, event);
                }
                events
            }
        }
    }

    /// Feed one encoder status read.
    pub fn observe_encoder(
        &mut self,
        status: HalResult<MagnetStatus>,
        now: Timestamp,
    ) -> FaultEvents {
        match status {
            Ok(status) => {
                self.i2c_streak = 0;
                self.encoder_faults = status.faults();
                self.raise_all(self.encoder_faults, FaultSource::Encoder, now)
            }
            Err(err) => {
                self.i2c_streak = self.i2c_streak.saturating_add(1);
                self.stats.i2c_errors = self.stats.i2c_errors.saturating_add(1);
                tracing::debug!(error = %err, streak = self.i2c_streak, "encoder read failed");
                if self.i2c_streak < self.thresholds.i2c_max_consecutive_errors {
                    return FaultEvents::new();
                }
                let mut faults = FaultSet::new();
                faults.insert(FaultType::EncoderI2cFailure);
                self.encoder_faults = faults;
                self.raise_all(faults, FaultSource::Encoder, now)
            }
        }
    }

    /// Feed one FLAG sample. A failed read counts as asserted.
    pub fn observe_flag_pin(&mut self, asserted: HalResult<bool>, now: Timestamp) -> FaultEvents {
        let asserted = asserted.unwrap_or_else(|err| {
            self.stats.flag_read_errors = self.stats.flag_read_errors.saturating_add(1);
            tracing::debug!(error = %err, "FLAG read failed, treating as asserted");
            true
        });
        if !asserted {
            self.flag_streak = 0;
            return FaultEvents::new();
        }
        self.flag_streak = self.flag_streak.saturating_add(1);
        if self.flag_streak < self.thresholds.flag_debounce_samples {
            return FaultEvents::new();
        }
        let mut events = FaultEvents::new();
        if let Some(event) = self.raise(FaultType::DriverFlagAsserted, FaultSource::FlagPin, now) {
            push_event(&mut events, event);
        }
        events
    }

    /// Read every device if the poll interval has elapsed.
    pub fn poll<S, I, F>(
        &mut self,
        chain: &mut L6470Chain<S>,
        encoder: Option<&mut As5600<I>>,
        flag: &mut F,
        now: Timestamp,
    ) -> PollReport
    where
        S: SpiBus,
        I: I2cBus,
        F: DigitalInput + ?Sized,
    {
        let interval = Duration::from_millis(u64::from(self.thresholds.poll_interval_ms));
        if let Some(last) = self.last_poll
            && now.saturating_sub(last) < interval
        {
            return PollReport::default();
        }
        self.last_poll = Some(now);
        self.stats.polls = self.stats.polls.saturating_add(1);

        let mut report = PollReport {
            polled: true,
            ..PollReport::default()
        };

        if self.drivers_powered {
            match chain.get_status() {
                Ok(statuses) => {
                    for (index, status) in statuses.iter().enumerate() {
                        let events = self.observe_driver(index, Ok(*status), now);
                        merge(&mut report.raised, events);
                    }
                }
                Err(err) => {
                    for index in 0..chain.len() {
                        let events = self.observe_driver(index, Err(err), now);
                        merge(&mut report.raised, events);
                    }
                }
            }
        }

        if let Some(encoder) = encoder {
            let events = self.observe_encoder(encoder.status(), now);
            merge(&mut report.raised, events);
        }

        let events = self.observe_flag_pin(FLAG_ACTIVE_LEVEL.sample(flag), now);
        merge(&mut report.raised, events);

        report.cleared = self.expire_warnings(now);
        report
    }

    /// Clear warnings whose condition has been gone long enough.
    pub fn expire_warnings(&mut self, now: Timestamp) -> FaultEvents {
        let hold = Duration::from_millis(u64::from(self.thresholds.warning_clear_ms));
        let observed = self.observed();
        let mut expired = FaultSet::new();
        for record in &self.records {
            if record.active
                && !record.fault.severity().is_latching()
                && !observed.contains(record.fault)
                && now.saturating_sub(record.last_seen) >= hold
            {
                expired.insert(record.fault);
            }
        }
        let mut events = FaultEvents::new();
        for fault in expired {
            push_event(&mut events, self.deactivate(fault, now));
        }
        events
    }

    fn deactivate(&mut self, fault: FaultType, now: Timestamp) -> FaultEvent {
        self.active.remove(fault);
        if let Some(record) = self.records.iter_mut().find(|record| record.fault == fault) {
            record.active = false;
        }
        self.stats.faults_cleared = self.stats.faults_cleared.saturating_add(1);
        tracing::info!(fault = %fault, "fault cleared");
        FaultEvent::Cleared { fault, at: now }
    }

    /// Clear one recoverable fault.
    ///
    /// # Errors
    ///
    /// Fails if the fault is not active, is not recoverable, or its condition
    /// is still observed.
    pub fn clear(&mut self, fault: FaultType, now: Timestamp) -> FaultResult<FaultEvent> {
        if self.active.contains(fault) && !fault.is_recoverable() {
            return Err(FaultError::NotRecoverable(fault));
        }
        self.acknowledge(fault, now)
    }

    /// Clear any active fault, including non-recoverable ones.
    ///
    /// # Errors
    ///
    /// Fails if the fault is not active or its condition is still observed.
    pub fn acknowledge(&mut self, fault: FaultType, now: Timestamp) -> FaultResult<FaultEvent> {
        if !self.active.contains(fault) {
            return Err(FaultError::NotActive(fault));
        }
        if self.observed().contains(fault) {
            return Err(FaultError::ConditionPresent(fault));
        }
        Ok(self.deactivate(fault, now))
    }

    /// Clear every recoverable fault whose condition is gone.
    pub fn clear_all_recoverable(&mut self, now: Timestamp) -> FaultEvents {
        let observed = self.observed();
        let clearable: FaultSet = self
            .active
            .iter()
            .filter(|fault| fault.is_recoverable() && !observed.contains(*fault))
            .collect();
        let mut events = FaultEvents::new();
        for fault in clearable {
            push_event(&mut events, self.deactivate(fault, now));
        }
        events
    }

    /// Tell the monitor whether the drivers are out of standby.
    ///
    /// A driver held in reset answers every read with all alarm bits
    /// asserted, so the chain is not read while unpowered and earlier driver
    /// observations are dropped.
    pub fn set_drivers_powered(&mut self, powered: bool) {
        if self.drivers_powered == powered {
            return;
        }
        self.drivers_powered = powered;
        if !powered {
            self.driver_faults = [FaultSet::EMPTY; MAX_CHAIN_LEN];
            self.spi_streak = [0; MAX_CHAIN_LEN];
            self.spi_failing = [false; MAX_CHAIN_LEN];
        }
        tracing::debug!(powered, "driver power state changed");
    }

    /// Whether the chain is read on poll.
    #[must_use]
    pub fn drivers_powered(&self) -> bool {
        self.drivers_powered
    }

    /// Active faults.
    #[must_use]
    pub fn active(&self) -> FaultSet {
        self.active
    }

    /// Whether `fault` is active.
    #[must_use]
    pub fn is_active(&self, fault: FaultType) -> bool {
        self.active.contains(fault)
    }

    /// Every fault seen since start-up.
    #[must_use]
    pub fn records(&self) -> &[FaultRecord] {
        &self.records
    }

    /// Record for one fault type, if it was ever raised.
    #[must_use]
    pub fn record(&self, fault: FaultType) -> Option<&FaultRecord> {
        self.records.iter().find(|record| record.fault == fault)
    }

    /// Most severe active classification.
    #[must_use]
    pub fn highest_severity(&self) -> Option<FaultSeverity> {
        self.active.highest_severity()
    }

    /// Running counters.
    #[must_use]
    pub fn statistics(&self) -> FaultStatistics {
        self.stats
    }

    /// Active thresholds.
    #[must_use]
    pub fn thresholds(&self) -> &FaultThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepper_hal::{BusErrorKind, HalError};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn monitor() -> Result<FaultMonitor, FaultError> {
        FaultMonitor::new(FaultThresholds::default())
    }

    #[test]
    fn test_raise_is_edge_triggered() -> Result<(), FaultError> {
        let mut monitor = monitor()?;
        assert!(monitor.raise(FaultType::External, FaultSource::External, ms(1)).is_some());
        assert!(monitor.raise(FaultType::External, FaultSource::External, ms(2)).is_none());

        let record = monitor.record(FaultType::External);
        assert_eq!(record.map(|r| r.occurrences), Some(1));
        assert_eq!(record.map(|r| r.last_seen), Some(ms(2)));
        assert_eq!(monitor.statistics().faults_raised, 1);
        Ok(())
    }

    #[test]
    fn test_spi_errors_count_to_limit() -> Result<(), FaultError> {
        let mut monitor = monitor()?;
        let err = Err(HalError::spi(BusErrorKind::Overrun));
        assert!(monitor.observe_driver(0, err, ms(0)).is_empty());
        assert!(monitor.observe_driver(0, err, ms(10)).is_empty());
        let events = monitor.observe_driver(0, err, ms(20));
        assert_eq!(events.len(), 1);
        assert!(monitor.is_active(FaultType::MotorSpiFailure));
        assert_eq!(monitor.statistics().spi_errors, 3);
        Ok(())
    }

    #[test]
    fn test_flag_debounce() -> Result<(), FaultError> {
        let mut monitor = monitor()?;
        assert!(monitor.observe_flag_pin(Ok(true), ms(0)).is_empty());
        assert!(monitor.observe_flag_pin(Ok(false), ms(10)).is_empty());
        assert!(monitor.observe_flag_pin(Ok(true), ms(20)).is_empty());
        assert_eq!(monitor.observe_flag_pin(Ok(true), ms(30)).len(), 1);
        Ok(())
    }

    #[test]
    fn test_out_of_range_driver_ignored() -> Result<(), FaultError> {
        let mut monitor = monitor()?;
        let events = monitor.observe_driver(MAX_CHAIN_LEN, Ok(L6470Status(0)), ms(0));
        assert!(events.is_empty());
        assert!(monitor.active().is_empty());
        Ok(())
    }
}
