//! # stepper-fault-monitor
//!
//! Fault detection and classification for the stepper safety core.
//!
//! The monitor reads the L6470 driver chain over SPI, the AS5600 encoder over
//! I2C and the wired-OR FLAG line, and turns what it sees into latched
//! [`FaultType`]s:
//!
//! - Every fault has a fixed [`FaultSeverity`] and [`FaultAction`]
//! - Events fire only on inactive-to-active edges
//! - Warnings clear on their own once the condition has been gone for
//!   `warning_clear_ms`; critical and emergency faults need an explicit clear
//! - Bus errors are counted, and only a run of them raises a fault
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use core::time::Duration;
//! use stepper_fault_monitor::prelude::*;
//! use stepper_fault_monitor::sim::L6470Sim;
//! use stepper_hal::mock::{MockI2c, MockPin, MockSpi};
//!
//! let spi = MockSpi::new();
//! let sim = L6470Sim::new(1);
//! sim.attach(&spi);
//! let mut chain = L6470Chain::new(spi, 1)?;
//! let mut flag = MockPin::new(true);
//! let mut monitor = FaultMonitor::new(FaultThresholds::default())?;
//!
//! sim.set_all(L6470Status(L6470Status::IDLE.raw() & !L6470Status::OCD));
//! let report = monitor.poll(&mut chain, None::<&mut As5600<MockI2c>>, &mut flag, Duration::ZERO);
//! assert_eq!(report.raised.len(), 1);
//! assert_eq!(monitor.highest_severity(), Some(FaultSeverity::Critical));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "mock"))]
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

extern crate alloc;

pub mod as5600;
pub mod error;
pub mod faults;
pub mod l6470;
pub mod monitor;
pub mod prelude;

#[cfg(feature = "mock")]
pub mod sim;

pub use as5600::{As5600, MagnetStatus};
pub use error::{FaultError, FaultResult};
pub use faults::{
    FaultAction, FaultRecord, FaultSet, FaultSetIter, FaultSeverity, FaultSource,
    FaultThresholds, FaultType,
};
pub use l6470::{ChainStatus, Command, L6470Chain, L6470Status, MAX_CHAIN_LEN, MotorStatus};
pub use monitor::{
    FaultEvent, FaultEvents, FaultMonitor, FaultStatistics, MAX_RECORDS, MAX_REPORTED,
    PollReport,
};
