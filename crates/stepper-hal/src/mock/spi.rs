use crate::bus::SpiBus;
use crate::error::{BusErrorKind, HalError, HalResult};
use alloc::boxed::Box;
use core::fmt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::vec::Vec;

/// Computes the MISO bytes for a MOSI frame. `None` falls through to the
/// scripted response queue.
pub type SpiResponder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct SpiInner {
    frames: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    responder: Option<SpiResponder>,
    fail_next: u32,
    fail_all: Option<BusErrorKind>,
}

/// Scripted SPI device.
///
/// Each `transfer_in_place`/`write` call is one chip-select frame and is logged.
/// Replies come from the responder if one is installed, otherwise from the
/// response queue, otherwise all zeros.
#[derive(Clone, Default)]
pub struct MockSpi {
    inner: Arc<Mutex<SpiInner>>,
}

impl fmt::Debug for MockSpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MockSpi")
            .field("frames", &inner.frames.len())
            .field("queued", &inner.responses.len())
            .field("responder", &inner.responder.is_some())
            .finish_non_exhaustive()
    }
}

impl MockSpi {
    /// Device with no scripted behaviour.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unanswered frame.
    pub fn push_response(&self, reply: &[u8]) {
        self.inner.lock().responses.push_back(reply.to_vec());
    }

    /// Install a responder that sees every frame.
    pub fn set_responder(&self, responder: SpiResponder) {
        self.inner.lock().responder = Some(responder);
    }

    /// Fail the next `count` frames with an overrun.
    pub fn fail_next(&self, count: u32) {
        self.inner.lock().fail_next = count;
    }

    /// Fail every frame with `kind` until called with `None`.
    pub fn fail_all(&self, kind: Option<BusErrorKind>) {
        self.inner.lock().fail_all = kind;
    }

    /// Every frame clocked out so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().frames.clone()
    }

    /// Forget recorded frames.
    pub fn clear_frames(&self) {
        self.inner.lock().frames.clear();
    }

    fn exchange(&self, mosi: &[u8]) -> HalResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        if let Some(kind) = inner.fail_all {
            return Err(HalError::spi(kind));
        }
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(HalError::spi(BusErrorKind::Overrun));
        }
        inner.frames.push(mosi.to_vec());

        let scripted = inner.responder.as_mut().and_then(|responder| responder(mosi));
        let reply = match scripted {
            Some(reply) => reply,
            None => inner.responses.pop_front().unwrap_or_default(),
        };
        Ok(reply)
    }
}

impl SpiBus for MockSpi {
    fn transfer_in_place(&mut self, frame: &mut [u8]) -> HalResult<()> {
        let reply = self.exchange(frame)?;
        for (i, byte) in frame.iter_mut().enumerate() {
            *byte = reply.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }

    fn write(&mut self, frame: &[u8]) -> HalResult<()> {
        self.exchange(frame).map(|_| ())
    }
}
