//! Encoder for bodies delimited by `Content-Length`.

use crate::ensure;
use crate::protocol::{PayloadItem, WriteError};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

/// Writes exactly the declared number of bytes.
///
/// Writing more than declared, or finishing with fewer, would desynchronize the peer's
/// framing, so both are rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    finished: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, finished: false }
    }

    pub fn is_finish(&self) -> bool {
        self.finished
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = WriteError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        ensure!(!self.finished, WriteError::invalid_write_state("body already finished"));

        match item {
            PayloadItem::Chunk(bytes) => {
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    error!(len, remaining = self.remaining, "body exceeds content-length");
                    return Err(WriteError::invalid_write_state(format!(
                        "chunk of {len} bytes exceeds the {} bytes left of content-length",
                        self.remaining
                    )));
                }
                self.remaining -= len;
                dst.put(bytes);
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                ensure!(
                    trailers.is_none_or(|t| t.is_empty()),
                    WriteError::invalid_write_state("trailers require a chunked body")
                );
                ensure!(
                    self.remaining == 0,
                    WriteError::invalid_write_state(format!("body ended {} bytes short of content-length", self.remaining))
                );
                self.finished = true;
                Ok(())
            }
        }
    }
}
