//! Safety event log.
//!
//! A fixed-depth ring of the most recent events, oldest first. Older entries
//! are overwritten; [`EventLog::total_recorded`] keeps counting.

use crate::config::EVENT_LOG_DEPTH;
use crate::state::SafetyState;
use core::fmt;
use heapless::HistoryBuffer;
use stepper_estop::TriggerSource;
use stepper_fault_monitor::{FaultEvent, FaultSource, FaultType};
use stepper_hal::Timestamp;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyEventKind {
    /// The safety state changed.
    StateChanged {
        /// Previous state.
        from: SafetyState,
        /// New state.
        to: SafetyState,
    },
    /// A fault became active.
    FaultRaised(FaultType, FaultSource),
    /// A fault was cleared.
    FaultCleared(FaultType),
    /// The e-stop latched, or its source was refined.
    EStopTriggered(TriggerSource),
    /// The e-stop latch was reset.
    EStopReset,
    /// Emergency disable finished.
    ResponseMeasured {
        /// Detection to outputs disabled.
        micros: u64,
        /// Whether it met the budget.
        within_budget: bool,
    },
    /// The main loop missed watchdog kicks.
    WatchdogMissed(u32),
    /// A recovery request was accepted.
    RecoveryStarted,
    /// A fault ended the recovery hold early.
    RecoveryAborted(FaultType),
}

impl From<FaultEvent> for SafetyEventKind {
    fn from(event: FaultEvent) -> Self {
        match event {
            FaultEvent::Raised { fault, source, .. } => Self::FaultRaised(fault, source),
            FaultEvent::Cleared { fault, .. } => Self::FaultCleared(fault),
        }
    }
}

/// A timestamped safety event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyEvent {
    /// When it happened.
    pub at: Timestamp,
    /// What happened.
    pub kind: SafetyEventKind,
}

impl fmt::Display for SafetyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8.3} ms] ", self.at.as_secs_f64() * 1000.0)?;
        match self.kind {
            SafetyEventKind::StateChanged { from, to } => write!(f, "state {from} -> {to}"),
            SafetyEventKind::FaultRaised(fault, source) => {
                write!(f, "fault raised: {fault} ({source})")
            }
            SafetyEventKind::FaultCleared(fault) => write!(f, "fault cleared: {fault}"),
            SafetyEventKind::EStopTriggered(source) => write!(f, "e-stop triggered: {source}"),
            SafetyEventKind::EStopReset => f.write_str("e-stop reset"),
            SafetyEventKind::ResponseMeasured {
                micros,
                within_budget,
            } => {
                let verdict = if within_budget { "ok" } else { "OVER BUDGET" };
                write!(f, "shutdown response {micros} us ({verdict})")
            }
            SafetyEventKind::WatchdogMissed(count) => write!(f, "watchdog missed {count} kick(s)"),
            SafetyEventKind::RecoveryStarted => f.write_str("recovery started"),
            SafetyEventKind::RecoveryAborted(fault) => write!(f, "recovery aborted by {fault}"),
        }
    }
}

/// Ring buffer of the last [`EVENT_LOG_DEPTH`] events.
pub struct EventLog {
    buffer: HistoryBuffer<SafetyEvent, EVENT_LOG_DEPTH>,
    total: u64,
}

impl EventLog {
    /// Empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: HistoryBuffer::new(),
            total: 0,
        }
    }

    /// Append an event, overwriting the oldest when full.
    pub fn push(&mut self, at: Timestamp, kind: SafetyEventKind) {
        self.buffer.write(SafetyEvent { at, kind });
        self.total = self.total.saturating_add(1);
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SafetyEvent> + '_ {
        self.buffer.oldest_ordered()
    }

    /// Most recent event.
    #[must_use]
    pub fn latest(&self) -> Option<&SafetyEvent> {
        self.buffer.recent()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Events recorded since start, including overwritten ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    /// Events lost to overwriting.
    #[must_use]
    pub fn overwritten(&self) -> u64 {
        self.total
            .saturating_sub(u64::try_from(self.buffer.len()).unwrap_or(u64::MAX))
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .field("total", &self.total)
            .field("latest", &self.latest())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn test_ring_keeps_newest() {
        let mut log = EventLog::new();
        for count in 0..40u32 {
            log.push(
                Duration::from_millis(u64::from(count)),
                SafetyEventKind::WatchdogMissed(count),
            );
        }
        assert_eq!(log.len(), EVENT_LOG_DEPTH);
        assert_eq!(log.total_recorded(), 40);
        assert_eq!(log.overwritten(), 8);

        let first = log.iter().next().map(|event| event.kind);
        assert_eq!(first, Some(SafetyEventKind::WatchdogMissed(8)));
        assert_eq!(
            log.latest().map(|event| event.kind),
            Some(SafetyEventKind::WatchdogMissed(39))
        );
    }

    #[test]
    fn test_fault_event_conversion() {
        let raised = FaultEvent::Raised {
            fault: FaultType::DriverOvercurrent,
            source: FaultSource::Driver(1),
            at: Duration::ZERO,
        };
        assert_eq!(
            SafetyEventKind::from(raised),
            SafetyEventKind::FaultRaised(FaultType::DriverOvercurrent, FaultSource::Driver(1))
        );
    }
}
