//! Inbound byte accumulation and backpressure bookkeeping.

use crate::transport::TransportSignal;
use bytes::{Bytes, BytesMut};
use tracing::debug;

/// Append at the back, consume from the front.
///
/// The buffer carries a size limit but does not enforce it on `append`: only while a message
/// head is still incomplete does exceeding the limit mean anything (see
/// [`ByteBuffer::exceeds_limit`]). Body bytes may legitimately pile up and are bounded by the
/// watermarks instead.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    buf: BytesMut,
    max_size: usize,
}

impl ByteBuffer {
    pub fn new(max_size: usize) -> Self {
        Self { buf: BytesMut::new(), max_size }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns up to `n` bytes from the front without removing them.
    pub fn peek(&self, n: usize) -> &[u8] {
        &self.buf[..n.min(self.buf.len())]
    }

    /// Removes up to `n` bytes from the front.
    pub fn consume(&mut self, n: usize) -> Bytes {
        let n = n.min(self.buf.len());
        self.buf.split_to(n).freeze()
    }

    /// Removes everything buffered.
    pub fn take_all(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn exceeds_limit(&self) -> bool {
        self.buf.len() > self.max_size
    }

    /// Exposes the storage to the codecs, which consume from it directly.
    pub(crate) fn as_bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

/// Edge-triggered high/low watermark.
///
/// `observe` reports a signal only when the level crosses a threshold in the direction that
/// changes the paused state, so repeated observations on the same side never repeat a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    high: usize,
    low: usize,
    paused: bool,
}

impl Watermark {
    pub fn new(high: usize, low: usize) -> Self {
        Self { high, low: low.min(high), paused: false }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn observe(&mut self, level: usize) -> Option<TransportSignal> {
        if !self.paused && level > self.high {
            self.paused = true;
            debug!(level, high = self.high, "pause reading");
            Some(TransportSignal::PauseReading)
        } else if self.paused && level < self.low {
            self.paused = false;
            debug!(level, low = self.low, "resume reading");
            Some(TransportSignal::ResumeReading)
        } else {
            None
        }
    }
}
