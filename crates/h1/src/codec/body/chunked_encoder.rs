//! Encoder for the chunked transfer coding.

use crate::ensure;
use crate::protocol::{PayloadItem, WriteError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;

/// Writes each chunk as `<hex-size>\r\n<data>\r\n` and the end as
/// `0\r\n<trailers>\r\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = WriteError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        ensure!(!self.eof, WriteError::invalid_write_state("body already finished"));

        match item {
            PayloadItem::Chunk(bytes) => {
                // a zero sized chunk would end the body
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                dst.put(bytes);
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                if let Some(trailers) = &trailers {
                    trailers.validate()?;
                }
                self.eof = true;
                dst.extend_from_slice(b"0\r\n");
                if let Some(trailers) = &trailers {
                    trailers.encode(dst);
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
