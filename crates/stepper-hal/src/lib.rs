//! # stepper-hal
//!
//! Thin hardware abstraction for the STM32H753 stepper safety core.
//!
//! The safety components (emergency stop, watchdog manager, fault monitor,
//! safety system) never touch vendor HAL types directly. They are written
//! against the small traits in this crate:
//!
//! - [`DigitalInput`] / [`DigitalOutput`] for e-stop channels, driver FLAG and
//!   driver standby lines
//! - [`SpiBus`] for the L6470 daisy chain
//! - [`I2cBus`] for the AS5600 encoder
//! - [`Clock`] for a monotonic time base
//! - [`WatchdogPeripheral`] for the IWDG / WWDG
//!
//! A board binds a concrete set of peripherals once through the [`Platform`]
//! trait. Real peripherals come in through the [`embedded`] adapters over
//! `embedded-hal` 1.0, which every STM32 HAL crate implements. Host-side tests
//! use the `mock` feature instead.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use stepper_hal::prelude::*;
//! use stepper_hal::mock::MockPin;
//!
//! let pin = MockPin::new(true);
//! let mut input = pin.clone();
//! assert!(input.is_high().unwrap_or(false));
//!
//! pin.set_level(false);
//! assert!(input.is_low().unwrap_or(false));
//! # }
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

pub mod bus;
pub mod clock;
pub mod embedded;
pub mod error;
pub mod gpio;
pub mod platform;
pub mod prelude;
pub mod watchdog;

#[cfg(feature = "mock")]
pub mod mock;

pub use bus::{I2cBus, SpiBus};
pub use clock::{Clock, Timestamp};
pub use error::{BusErrorKind, HalError, HalResult};
pub use gpio::{ActiveLevel, DigitalInput, DigitalOutput};
pub use platform::{Platform, PlatformParts};
pub use watchdog::{WatchdogKind, WatchdogPeripheral, WatchdogTiming};
