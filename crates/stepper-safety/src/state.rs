//! Safety state machine.

use core::fmt;

/// System-wide safety state.
///
/// ```text
/// any ──────────────────────────► EmergencyStop
/// Safe ◄──────────────────────► Warning
/// Safe | Warning | Recovery ────► Fault
/// Fault | EmergencyStop ────────► Recovery
/// Recovery ─────────────────────► Safe | Warning
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SafetyState {
    /// Normal operation.
    #[default]
    Safe = 0,
    /// Degraded but operational.
    Warning = 1,
    /// A critical fault stopped the motors.
    Fault = 2,
    /// E-stop latched; drivers disabled and in standby.
    EmergencyStop = 3,
    /// Waiting out the recovery hold before motion is allowed again.
    Recovery = 4,
}

impl SafetyState {
    /// Every state, in discriminant order.
    pub const ALL: [SafetyState; 5] = [
        SafetyState::Safe,
        SafetyState::Warning,
        SafetyState::Fault,
        SafetyState::EmergencyStop,
        SafetyState::Recovery,
    ];

    /// Convert from raw u8 value.
    #[must_use]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Safe),
            1 => Some(Self::Warning),
            2 => Some(Self::Fault),
            3 => Some(Self::EmergencyStop),
            4 => Some(Self::Recovery),
            _ => None,
        }
    }

    /// Convert to raw u8 value.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        self as u8
    }

    /// Whether the state machine permits `from -> to`.
    ///
    /// Staying in the same state is not a transition.
    #[must_use]
    pub const fn transition_allowed(from: Self, to: Self) -> bool {
        use SafetyState::{EmergencyStop, Fault, Recovery, Safe, Warning};
        match (from, to) {
            (EmergencyStop, EmergencyStop) => false,
            (_, EmergencyStop)
            | (Safe, Warning)
            | (Warning, Safe)
            | (Safe | Warning | Recovery, Fault)
            | (Fault | EmergencyStop, Recovery)
            | (Recovery, Safe | Warning) => true,
            _ => false,
        }
    }

    /// Method form of [`transition_allowed`](Self::transition_allowed).
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        Self::transition_allowed(self, to)
    }

    /// Whether the motor controller may move.
    #[must_use]
    pub const fn permits_motion(self) -> bool {
        matches!(self, Self::Safe | Self::Warning)
    }

    /// Get the state as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Warning => "Warning",
            Self::Fault => "Fault",
            Self::EmergencyStop => "EmergencyStop",
            Self::Recovery => "Recovery",
        }
    }
}

impl fmt::Display for SafetyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
