//! Byte-level state both connection roles share.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::buffer::{ByteBuffer, Watermark};
use crate::config::H1Config;
use crate::transport::TransportSignal;

/// Inbound buffer, outbound bytes and the signals owed to the transport.
#[derive(Debug)]
pub(crate) struct Wire {
    input: ByteBuffer,
    eof: bool,
    output: BytesMut,
    watermark: Watermark,
    signals: VecDeque<TransportSignal>,
    close_when_flushed: bool,
    close_signalled: bool,
}

impl Wire {
    pub(crate) fn new(config: &H1Config) -> Self {
        Self {
            input: ByteBuffer::new(config.max_head_size()),
            eof: false,
            output: BytesMut::new(),
            watermark: Watermark::new(config.high_watermark(), config.low_watermark()),
            signals: VecDeque::new(),
            close_when_flushed: false,
            close_signalled: false,
        }
    }

    pub(crate) fn feed(&mut self, bytes: &[u8]) {
        if self.eof {
            trace!(len = bytes.len(), "ignore bytes after end of input");
            return;
        }
        self.input.append(bytes);
        self.observe();
    }

    pub(crate) fn feed_eof(&mut self) {
        debug!(buffered = self.input.len(), "end of input");
        self.eof = true;
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    /// Re-evaluates the watermark after the buffered level changed.
    pub(crate) fn observe(&mut self) {
        if let Some(signal) = self.watermark.observe(self.input.len()) {
            self.signals.push_back(signal);
        }
    }

    pub(crate) fn input(&mut self) -> &mut BytesMut {
        self.input.as_bytes_mut()
    }

    pub(crate) fn input_len(&self) -> usize {
        self.input.len()
    }

    /// An incomplete head has outgrown the buffer limit.
    pub(crate) fn head_overflow(&self) -> bool {
        self.input.exceeds_limit()
    }

    /// Everything buffered, as tunnel bytes.
    pub(crate) fn take_input(&mut self) -> Option<Bytes> {
        if self.input.is_empty() { None } else { Some(self.input.take_all()) }
    }

    pub(crate) fn discard_input(&mut self) {
        self.input.clear();
        self.observe();
    }

    pub(crate) fn output(&mut self) -> &mut BytesMut {
        &mut self.output
    }

    pub(crate) fn poll_output(&mut self) -> Option<Bytes> {
        if self.output.is_empty() { None } else { Some(self.output.split().freeze()) }
    }

    pub(crate) fn poll_signal(&mut self) -> Option<TransportSignal> {
        if let Some(signal) = self.signals.pop_front() {
            return Some(signal);
        }
        if self.close_when_flushed && !self.close_signalled && self.output.is_empty() {
            self.close_signalled = true;
            return Some(TransportSignal::Close);
        }
        None
    }

    /// Signals `Close` once the pending output has been taken.
    pub(crate) fn close_after_flush(&mut self) {
        if !self.close_when_flushed {
            debug!(pending = self.output.len(), "close after flush");
            self.close_when_flushed = true;
        }
    }

    pub(crate) fn abort(&mut self) {
        self.input.clear();
        self.output.clear();
        self.signals.clear();
        self.close_when_flushed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_waits_for_output() {
        let mut wire = Wire::new(&H1Config::default());
        wire.output().extend_from_slice(b"bye");
        wire.close_after_flush();

        assert_eq!(wire.poll_signal(), None);
        assert_eq!(wire.poll_output().unwrap(), Bytes::from_static(b"bye"));
        assert_eq!(wire.poll_signal(), Some(TransportSignal::Close));
        assert_eq!(wire.poll_signal(), None);
    }

    #[test]
    fn watermark_signals_follow_the_buffer() {
        let mut wire = Wire::new(&H1Config::default().with_watermarks(8, 4));
        wire.feed(b"0123456789");
        assert_eq!(wire.poll_signal(), Some(TransportSignal::PauseReading));
        wire.feed(b"more");
        assert_eq!(wire.poll_signal(), None);

        wire.discard_input();
        assert_eq!(wire.poll_signal(), Some(TransportSignal::ResumeReading));
    }
}
