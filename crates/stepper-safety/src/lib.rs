//! # stepper-safety
//!
//! The safety and fault-response core of the stepper controller.
//!
//! [`SafetySystem`] owns the e-stop handler, the watchdog manager, the fault
//! monitor and the driver shutdown path, and runs them as one state machine:
//!
//! ```text
//! ┌──────┐ warning ┌─────────┐
//! │ Safe │◄───────►│ Warning │
//! └──┬───┘         └────┬────┘
//!    │ critical fault   │            e-stop / emergency fault (from any state)
//!    ▼                  ▼            ──────────────────────► ┌───────────────┐
//! ┌───────┐  request_recovery()  ┌──────────┐                │ EmergencyStop │
//! │ Fault │─────────────────────►│ Recovery │◄───────────────┴───────────────┘
//! └───────┘◄─────────────────────└────┬─────┘  request_recovery()
//!             critical fault          │ hold elapsed
//!                                     ▼
//!                               Safe / Warning
//! ```
//!
//! Each [`tick`](SafetySystem::tick) polls the e-stop first, so a press is
//! acted on before anything else in the iteration. Emergency disable sends
//! `HARD_HIZ` to every driver and drops STBY/RST; its duration is checked
//! against the e-stop response budget.
//!
//! The resulting [`SafetyStatus`] is published through
//! [`SharedSafetyStatus`] for the motor controller and communication tasks.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "std")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use stepper_fault_monitor::MagnetStatus;
//! use stepper_fault_monitor::sim::{L6470Sim, attach_as5600};
//! use stepper_hal::mock::MockPlatform;
//! use stepper_safety::prelude::*;
//!
//! let (parts, handles) = MockPlatform::standard();
//! L6470Sim::new(2).attach(&handles.motor_spi);
//! attach_as5600(&handles.encoder_i2c, MagnetStatus::NOMINAL);
//! let mut system = SafetySystem::new(parts, SafetyConfig::default())?;
//! assert_eq!(system.state(), SafetyState::Safe);
//!
//! handles.press_estop();
//! for _ in 0..20 {
//!     handles.clock.advance_ms(1);
//!     system.kick_watchdog();
//!     system.tick()?;
//! }
//! assert_eq!(system.state(), SafetyState::EmergencyStop);
//! assert!(!system.shared().motion_permitted());
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

extern crate alloc;

pub mod config;
pub mod error;
pub mod event;
pub mod prelude;
pub mod shutdown;
pub mod state;
pub mod status;
pub mod system;

pub use config::{EVENT_LOG_DEPTH, SafetyConfig, SafetyConfigBuilder};
pub use error::{SafetyError, SafetyResult};
pub use event::{EventLog, SafetyEvent, SafetyEventKind};
pub use shutdown::{DriverShutdown, MotorShutdown};
pub use state::SafetyState;
pub use status::{SafetyStatus, SharedSafetyStatus};
pub use system::SafetySystem;
