//! Prelude for stepper-watchdog.
//!
//! ```rust
//! use stepper_watchdog::prelude::*;
//!
//! let config = WatchdogConfig::default();
//! assert_eq!(config.timeout_ms, 100);
//! ```

pub use crate::config::{WatchdogConfig, WatchdogConfigBuilder};
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::manager::{WatchdogManager, WatchdogTick};
pub use crate::state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
