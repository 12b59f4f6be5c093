use crate::bus::I2cBus;
use crate::error::{BusErrorKind, HalError, HalResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct I2cInner {
    devices: BTreeMap<u8, [u8; 256]>,
    nacking: BTreeSet<u8>,
    fail_next: u32,
    transactions: u64,
}

/// Register-map I2C bus.
///
/// Each attached device is a 256-byte register file with an auto-incrementing
/// pointer, which is how the AS5600 and most sensors behave.
#[derive(Debug, Clone, Default)]
pub struct MockI2c {
    inner: Arc<Mutex<I2cInner>>,
}

impl MockI2c {
    /// Bus with no devices attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device with all registers zeroed.
    pub fn attach(&self, address: u8) {
        self.inner.lock().devices.entry(address).or_insert([0; 256]);
    }

    /// Set one register on an attached device. Attaches it if needed.
    pub fn set_register(&self, address: u8, register: u8, value: u8) {
        let mut inner = self.inner.lock();
        let regs = inner.devices.entry(address).or_insert([0; 256]);
        if let Some(slot) = regs.get_mut(usize::from(register)) {
            *slot = value;
        }
    }

    /// Set a big-endian 16-bit register pair starting at `register`.
    pub fn set_register_u16(&self, address: u8, register: u8, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.set_register(address, register, hi);
        self.set_register(address, register.wrapping_add(1), lo);
    }

    /// Read back a register, `None` if the device is not attached.
    #[must_use]
    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        self.inner
            .lock()
            .devices
            .get(&address)
            .and_then(|regs| regs.get(usize::from(register)).copied())
    }

    /// Make `address` stop (or resume) acknowledging.
    pub fn set_nack(&self, address: u8, nack: bool) {
        let mut inner = self.inner.lock();
        if nack {
            inner.nacking.insert(address);
        } else {
            inner.nacking.remove(&address);
        }
    }

    /// Fail the next `count` transactions with a bus error.
    pub fn fail_next(&self, count: u32) {
        self.inner.lock().fail_next = count;
    }

    /// Number of transactions attempted, failed ones included.
    #[must_use]
    pub fn transaction_count(&self) -> u64 {
        self.inner.lock().transactions
    }

    fn begin(inner: &mut I2cInner, address: u8) -> HalResult<()> {
        inner.transactions = inner.transactions.saturating_add(1);
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(HalError::i2c(address, BusErrorKind::Bus));
        }
        if inner.nacking.contains(&address) || !inner.devices.contains_key(&address) {
            return Err(HalError::i2c(address, BusErrorKind::Nack));
        }
        Ok(())
    }
}

impl I2cBus for MockI2c {
    fn write(&mut self, address: u8, bytes: &[u8]) -> HalResult<()> {
        let mut inner = self.inner.lock();
        Self::begin(&mut inner, address)?;
        let Some((&pointer, data)) = bytes.split_first() else {
            return Ok(());
        };
        if let Some(regs) = inner.devices.get_mut(&address) {
            let mut reg = pointer;
            for &value in data {
                if let Some(slot) = regs.get_mut(usize::from(reg)) {
                    *slot = value;
                }
                reg = reg.wrapping_add(1);
            }
        }
        Ok(())
    }

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> HalResult<()> {
        let mut inner = self.inner.lock();
        Self::begin(&mut inner, address)?;
        let mut reg = bytes.first().copied().unwrap_or(0);
        if let Some(regs) = inner.devices.get(&address) {
            for byte in buffer.iter_mut() {
                *byte = regs.get(usize::from(reg)).copied().unwrap_or(0);
                reg = reg.wrapping_add(1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_increment_read() {
        let mut bus = MockI2c::new();
        bus.set_register_u16(0x36, 0x0C, 0x0ABC);
        let mut buf = [0u8; 2];
        assert_eq!(bus.read_register(0x36, 0x0C, &mut buf), Ok(()));
        assert_eq!(buf, [0x0A, 0xBC]);
    }

    #[test]
    fn test_missing_device_nacks() {
        let mut bus = MockI2c::new();
        let mut buf = [0u8; 1];
        assert_eq!(
            bus.read_register(0x36, 0x0B, &mut buf),
            Err(HalError::i2c(0x36, BusErrorKind::Nack))
        );
        assert_eq!(bus.transaction_count(), 1);
    }
}
