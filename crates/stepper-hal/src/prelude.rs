//! Prelude module for convenient imports.
//!
//! ```rust
//! use stepper_hal::prelude::*;
//! ```

pub use crate::bus::{I2cBus, SpiBus};
pub use crate::clock::{Clock, Timestamp};
pub use crate::error::{BusErrorKind, HalError, HalResult};
pub use crate::gpio::{ActiveLevel, DigitalInput, DigitalOutput};
pub use crate::platform::{Platform, PlatformParts};
pub use crate::watchdog::{WatchdogKind, WatchdogPeripheral, WatchdogTiming};
