//! Prelude module for convenient imports.
//!
//! ```rust
//! use stepper_fault_monitor::prelude::*;
//! ```

pub use crate::as5600::{As5600, MagnetStatus};
pub use crate::error::{FaultError, FaultResult};
pub use crate::faults::{
    FaultAction, FaultRecord, FaultSet, FaultSeverity, FaultSource, FaultThresholds, FaultType,
};
pub use crate::l6470::{ChainStatus, Command, L6470Chain, L6470Status, MotorStatus};
pub use crate::monitor::{FaultEvent, FaultEvents, FaultMonitor, FaultStatistics, PollReport};
