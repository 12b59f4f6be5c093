//! Prelude for stepper-estop.
//!
//! ```rust
//! use stepper_estop::prelude::*;
//!
//! let config = EStopConfig::default();
//! assert!(config.dual_channel);
//! ```

pub use crate::config::{EStopConfig, EStopConfigBuilder};
pub use crate::error::{EStopError, EStopResult, ResetRefusal};
pub use crate::estop::{
    ChannelLevels, EStopEvent, EStopState, EmergencyStop, ResponseCheck, ResponseStats,
    TriggerSource,
};
