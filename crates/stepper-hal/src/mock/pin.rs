use crate::error::{HalError, HalResult};
use crate::gpio::{DigitalInput, DigitalOutput};
use parking_lot::Mutex;
use std::sync::Arc;
use std::vec::Vec;

/// One recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    /// Level that was driven.
    pub high: bool,
}

#[derive(Debug, Default)]
struct PinInner {
    high: bool,
    fail_reads: bool,
    fail_writes: bool,
    writes: Vec<PinWrite>,
}

/// Shared-state GPIO pin usable as input and output.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    inner: Arc<Mutex<PinInner>>,
}

impl MockPin {
    /// Pin at the given initial level.
    #[must_use]
    pub fn new(high: bool) -> Self {
        let pin = Self::default();
        pin.inner.lock().high = high;
        pin
    }

    /// Set the electrical level seen by readers.
    pub fn set_level(&self, high: bool) {
        self.inner.lock().high = high;
    }

    /// Current electrical level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.inner.lock().high
    }

    /// Make subsequent reads fail until cleared.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// Make subsequent writes fail until cleared.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Every successful write so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<PinWrite> {
        self.inner.lock().writes.clone()
    }

    fn drive(&self, high: bool) -> HalResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(HalError::Gpio);
        }
        inner.high = high;
        inner.writes.push(PinWrite { high });
        Ok(())
    }
}

impl DigitalInput for MockPin {
    fn is_high(&mut self) -> HalResult<bool> {
        let inner = self.inner.lock();
        if inner.fail_reads {
            return Err(HalError::Gpio);
        }
        Ok(inner.high)
    }
}

impl DigitalOutput for MockPin {
    fn set_high(&mut self) -> HalResult<()> {
        self.drive(true)
    }

    fn set_low(&mut self) -> HalResult<()> {
        self.drive(false)
    }
}
