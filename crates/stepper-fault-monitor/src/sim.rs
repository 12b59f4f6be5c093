//! Scripted device models for host tests.

use crate::as5600::{self, MagnetStatus};
use crate::l6470::{Command, L6470Status};
use alloc::boxed::Box;
use parking_lot::Mutex;
use std::sync::Arc;
use std::vec::Vec;
use stepper_hal::mock::{MockI2c, MockSpi};

#[derive(Debug)]
struct ChainModel {
    statuses: Vec<u16>,
    commands: Vec<Command>,
    pending: Option<(Vec<u16>, usize)>,
}

/// An L6470 daisy chain answering on a [`MockSpi`].
///
/// `GET_STATUS` latches a snapshot of the scripted statuses which the next
/// two frames clock out, MSB first. Every other broadcast command is logged.
#[derive(Debug, Clone)]
pub struct L6470Sim {
    model: Arc<Mutex<ChainModel>>,
}

impl L6470Sim {
    /// A chain of `len` idle drivers.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            model: Arc::new(Mutex::new(ChainModel {
                statuses: std::vec![L6470Status::IDLE.raw(); len],
                commands: Vec::new(),
                pending: None,
            })),
        }
    }

    /// Install the model as the responder of `spi`.
    pub fn attach(&self, spi: &MockSpi) {
        let model = Arc::clone(&self.model);
        spi.set_responder(Box::new(move |frame: &[u8]| {
            let mut model = model.lock();
            if let Some((snapshot, byte)) = model.pending.take() {
                let reply = snapshot
                    .iter()
                    .map(|status| {
                        let [msb, lsb] = status.to_be_bytes();
                        if byte == 0 { msb } else { lsb }
                    })
                    .collect::<Vec<u8>>();
                if byte == 0 {
                    model.pending = Some((snapshot, 1));
                }
                return Some(reply);
            }
            let command = match frame.first().copied() {
                Some(0xD0) => Command::GetStatus,
                Some(0xB0) => Command::SoftStop,
                Some(0xB8) => Command::HardStop,
                Some(0xA0) => Command::SoftHiZ,
                Some(0xA8) => Command::HardHiZ,
                _ => return None,
            };
            model.commands.push(command);
            if command == Command::GetStatus {
                let snapshot = model.statuses.clone();
                model.pending = Some((snapshot, 0));
            }
            Some(std::vec![0; frame.len()])
        }));
    }

    /// Script driver `index`'s status.
    pub fn set_status(&self, index: usize, status: L6470Status) {
        if let Some(slot) = self.model.lock().statuses.get_mut(index) {
            *slot = status.raw();
        }
    }

    /// Script every driver's status.
    pub fn set_all(&self, status: L6470Status) {
        for slot in &mut self.model.lock().statuses {
            *slot = status.raw();
        }
    }

    /// Broadcast commands received so far, `GET_STATUS` included.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.model.lock().commands.clone()
    }

    /// Commands other than `GET_STATUS`.
    #[must_use]
    pub fn control_commands(&self) -> Vec<Command> {
        self.commands()
            .into_iter()
            .filter(|command| *command != Command::GetStatus)
            .collect()
    }
}

/// Attach an AS5600 to `bus` with the given magnet status.
pub fn attach_as5600(bus: &MockI2c, status: MagnetStatus) {
    bus.attach(as5600::ADDRESS);
    set_magnet(bus, status);
    bus.set_register(as5600::ADDRESS, as5600::reg::AGC, 0x80);
    bus.set_register_u16(as5600::ADDRESS, as5600::reg::MAGNITUDE, 0x0800);
}

/// Change the magnet status of an attached AS5600.
pub fn set_magnet(bus: &MockI2c, status: MagnetStatus) {
    bus.set_register(as5600::ADDRESS, as5600::reg::STATUS, status.0);
}
