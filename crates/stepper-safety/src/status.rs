//! Safety status snapshot and its lock-free publication.

use crate::state::SafetyState;
use core::time::Duration;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use stepper_fault_monitor::{FaultSet, FaultSeverity};
use stepper_watchdog::WatchdogStatus;

/// Everything the rest of the firmware needs to know after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyStatus {
    /// Current state.
    pub state: SafetyState,
    /// Active faults.
    pub active_faults: FaultSet,
    /// Worst active severity.
    pub highest_severity: Option<FaultSeverity>,
    /// Whether the e-stop latch is set.
    pub estop_triggered: bool,
    /// Whether the motor controller may move.
    pub motion_permitted: bool,
    /// Watchdog manager status.
    pub watchdog_status: WatchdogStatus,
    /// Most recent emergency-disable time.
    pub last_response_us: u64,
    /// Longest emergency-disable time.
    pub worst_response_us: u64,
    /// Time since the safety system started.
    pub uptime: Duration,
}

/// Safety status shared with the motor controller and communication tasks.
///
/// Every field is a separate atomic, so a reader can observe a mix of two
/// publications. [`sequence`](Self::sequence) changes on every publish;
/// readers that need a consistent view re-read until it is stable.
///
/// Before the first publish it reads as an emergency stop with motion
/// forbidden.
#[derive(Debug)]
pub struct SharedSafetyStatus {
    state: AtomicU8,
    faults: AtomicU32,
    motion_permitted: AtomicBool,
    estop_triggered: AtomicBool,
    sequence: AtomicU32,
}

impl SharedSafetyStatus {
    /// Unpublished status.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SafetyState::EmergencyStop.to_raw()),
            faults: AtomicU32::new(0),
            motion_permitted: AtomicBool::new(false),
            estop_triggered: AtomicBool::new(true),
            sequence: AtomicU32::new(0),
        }
    }

    /// Publish a snapshot.
    pub fn publish(&self, status: &SafetyStatus) {
        // Drop motion permission first and grant it last.
        if !status.motion_permitted {
            self.motion_permitted.store(false, Ordering::Release);
        }
        self.state.store(status.state.to_raw(), Ordering::Release);
        self.faults.store(status.active_faults.bits(), Ordering::Release);
        self.estop_triggered
            .store(status.estop_triggered, Ordering::Release);
        if status.motion_permitted {
            self.motion_permitted.store(true, Ordering::Release);
        }
        self.sequence.fetch_add(1, Ordering::AcqRel);
    }

    /// Published state. An unknown value reads as `EmergencyStop`.
    #[must_use]
    pub fn state(&self) -> SafetyState {
        SafetyState::from_raw(self.state.load(Ordering::Acquire))
            .unwrap_or(SafetyState::EmergencyStop)
    }

    /// Published fault set.
    #[must_use]
    pub fn active_faults(&self) -> FaultSet {
        FaultSet::from_bits(self.faults.load(Ordering::Acquire))
    }

    /// Whether motion is permitted.
    #[must_use]
    pub fn motion_permitted(&self) -> bool {
        self.motion_permitted.load(Ordering::Acquire)
    }

    /// Whether the e-stop is latched.
    #[must_use]
    pub fn estop_triggered(&self) -> bool {
        self.estop_triggered.load(Ordering::Acquire)
    }

    /// Number of publications so far (wrapping).
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence.load(Ordering::Acquire)
    }
}

impl Default for SharedSafetyStatus {
    fn default() -> Self {
        Self::new()
    }
}
