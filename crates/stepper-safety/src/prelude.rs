//! Prelude for stepper-safety.
//!
//! Re-exports the component types a caller needs alongside the safety
//! system itself.
//!
//! ```rust
//! use stepper_safety::prelude::*;
//!
//! let config = SafetyConfig::default();
//! assert_eq!(config.recovery_hold_ms, 500);
//! assert!(SafetyState::Safe.permits_motion());
//! ```

pub use crate::config::{SafetyConfig, SafetyConfigBuilder};
pub use crate::error::{SafetyError, SafetyResult};
pub use crate::event::{EventLog, SafetyEvent, SafetyEventKind};
pub use crate::shutdown::{DriverShutdown, MotorShutdown};
pub use crate::state::SafetyState;
pub use crate::status::{SafetyStatus, SharedSafetyStatus};
pub use crate::system::SafetySystem;

pub use stepper_estop::{EStopConfig, TriggerSource};
pub use stepper_fault_monitor::{FaultSet, FaultSeverity, FaultSource, FaultThresholds, FaultType};
pub use stepper_watchdog::{WatchdogConfig, WatchdogStatus};
