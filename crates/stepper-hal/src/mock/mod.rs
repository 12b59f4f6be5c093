//! Host-side mock peripherals.
//!
//! Every mock is a cheap handle around shared state (`Arc<parking_lot::Mutex<_>>`
//! or an atomic). Clone a handle before moving the peripheral into a component
//! and keep the clone to drive levels, inject faults and advance time from the
//! test.

mod clock;
mod i2c;
mod pin;
mod platform;
mod spi;
mod watchdog;

pub use clock::MockClock;
pub use i2c::MockI2c;
pub use pin::{MockPin, PinWrite};
pub use platform::{MockHandles, MockPlatform};
pub use spi::{MockSpi, SpiResponder};
pub use watchdog::MockWatchdog;
