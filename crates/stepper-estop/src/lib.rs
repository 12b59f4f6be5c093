//! # stepper-estop
//!
//! Emergency-stop input handling for the stepper safety core.
//!
//! The handler samples one or two e-stop channels, debounces them, and holds a
//! latch that only an explicit reset request can clear. In dual-channel mode
//! a disagreement between the channels that outlasts the discrepancy window
//! latches the stop as well.
//!
//! An unreadable input is treated as pressed.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "std")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use core::time::Duration;
//! use stepper_estop::prelude::*;
//! use stepper_hal::mock::MockPin;
//!
//! // Channel A is active low, channel B active high.
//! let a = MockPin::new(true);
//! let b = MockPin::new(false);
//! let mut estop = EmergencyStop::new(a.clone(), Some(b.clone()), EStopConfig::default())?;
//!
//! a.set_level(false);
//! b.set_level(true);
//! assert_eq!(estop.poll(Duration::from_millis(0)), EStopEvent::None);
//! assert_eq!(
//!     estop.poll(Duration::from_millis(10)),
//!     EStopEvent::Triggered(TriggerSource::Button)
//! );
//! assert!(estop.is_triggered());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "std"))]
//! # fn main() {}
//! ```

#![no_std]
#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod debounce;
pub mod error;
pub mod estop;
pub mod prelude;

pub use config::{EStopConfig, EStopConfigBuilder};
pub use debounce::Debouncer;
pub use error::{EStopError, EStopResult, ResetRefusal};
pub use estop::{
    ChannelLevels, EStopEvent, EStopState, EmergencyStop, ResponseCheck, ResponseStats,
    TriggerSource,
};
