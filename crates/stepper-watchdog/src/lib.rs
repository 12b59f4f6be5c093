//! # stepper-watchdog
//!
//! Watchdog management for the stepper safety core.
//!
//! This crate provides a `#![no_std]`-compatible manager for the STM32 IWDG and
//! WWDG with:
//! - Register timing computed from a validated [`WatchdogConfig`]
//! - Periodic refresh scheduling with an optional early-refresh window
//! - Missed-kick counting against application liveness check-ins
//! - An atomic state machine with deterministic transitions
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────┐  start()  ┌─────────┐  missed >= max  ┌─────────┐
//! │ Stopped │──────────►│ Running │────────────────►│ Starved │
//! └─────────┘           └─────────┘◄────────────────└─────────┘
//!      ▲                     │        kick resumes       │
//!      │ reset()             │ timeout           timeout │
//!      │                     ▼                           │
//!      │               ┌─────────┐                       │
//!      └───────────────│ Expired │◄──────────────────────┘
//!                      └─────────┘
//! ```
//!
//! `inhibit()` moves any state to `Tripped`, after which nothing is refreshed.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "std")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use core::time::Duration;
//! use stepper_hal::mock::MockWatchdog;
//! use stepper_hal::mock::MockClock;
//! use stepper_hal::WatchdogKind;
//! use stepper_watchdog::prelude::*;
//!
//! let clock = MockClock::new();
//! let peripheral = MockWatchdog::new(WatchdogKind::Independent, clock.clone());
//! let mut manager = WatchdogManager::new(peripheral, WatchdogConfig::default())?;
//!
//! manager.start(Duration::ZERO)?;
//! manager.kick();
//! assert_eq!(manager.service(Duration::from_millis(50))?, WatchdogTick::Refreshed);
//! assert!(manager.is_healthy());
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
pub mod manager;
pub mod prelude;
pub mod state;

pub use config::{WatchdogConfig, WatchdogConfigBuilder, iwdg_timing, wwdg_timing};
pub use error::{WatchdogError, WatchdogResult};
pub use manager::{WatchdogManager, WatchdogTick};
pub use state::{WatchdogMetrics, WatchdogState, WatchdogStatus};
