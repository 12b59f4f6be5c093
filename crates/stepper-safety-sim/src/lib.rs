//! # stepper-safety-sim
//!
//! Host-side simulator for the stepper safety core. Scenarios run the real
//! [`SafetySystem`](stepper_safety::SafetySystem) against mock peripherals
//! and scripted L6470/AS5600 models on a simulated clock, one millisecond
//! per main-loop pass.
//!
//! ```rust
//! use stepper_safety::SafetyConfig;
//! use stepper_safety_sim::{Scenario, run};
//!
//! # fn main() -> Result<(), stepper_safety_sim::SimError> {
//! let report = run(Scenario::DriverOvercurrent, &SafetyConfig::default())?;
//! assert!(report.recovered);
//! # Ok(())
//! # }
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod board;
pub mod error;
pub mod report;
pub mod scenarios;

pub use board::{SimBoard, TICK};
pub use error::{SimError, SimResult};
pub use report::ScenarioReport;
pub use scenarios::{Scenario, run, run_all};
