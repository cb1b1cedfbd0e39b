//! Decoder for the chunked transfer coding.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding>
//!
//! The size line and the CRLF framing are consumed one byte at a time, so the decoder can
//! stop and resume at any byte boundary. Chunk data is handed out as soon as it is buffered,
//! without waiting for the whole chunk. Trailers are parsed with the same grammar and limits
//! as a message head.

use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::head::decode_trailers;
use crate::config::HeadLimits;
use crate::protocol::{HeaderList, ParseError, PayloadItem};
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    size_digits: usize,
    /// Bytes of the current size line, excluding its CRLF
    line_len: usize,
    limits: HeadLimits,
}

impl ChunkedDecoder {
    pub fn new(limits: HeadLimits) -> Self {
        Self { state: Size, remaining_size: 0, size_digits: 0, line_len: 0, limits }
    }

    pub fn is_complete(&self) -> bool {
        self.state == End
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Hex digits of the chunk size
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Chunk extensions, ignored
    Extension,
    /// LF closing the size line
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    /// Trailer block after the last chunk
    Trailers,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                End => return Ok(None),
                Trailers => {
                    let Some(trailers) = decode_trailers(src, &self.limits)? else {
                        return Ok(None);
                    };
                    trace!(trailers = trailers.as_ref().map_or(0, HeaderList::len), "finished reading chunked data");
                    self.state = End;
                    return Ok(Some(PayloadItem::Eof(trailers)));
                }
                _ => {}
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;
            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(result) => result?,
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.is_empty() {
            return Poll::Pending;
        }
        $src.get_u8()
    }};
}

/// Takes the next byte of the size line, counting it against the line limit.
macro_rules! try_next_line_byte {
    ($self:ident, $src:ident) => {{
        let b = try_next_byte!($src);
        if b != b'\r' {
            $self.line_len += 1;
            if $self.line_len > $self.limits.max_line_size {
                return Poll::Ready(Err(ParseError::malformed_chunk(format!(
                    "chunk size line exceed the limit {}",
                    $self.limits.max_line_size
                ))));
            }
        }
        b
    }};
}

impl ChunkedDecoder {
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        match self.state {
            Size => self.read_size(src),
            SizeLws => self.read_size_lws(src),
            Extension => self.read_extension(src),
            SizeLf => self.read_size_lf(src),
            Body => self.read_body(src, buf),
            BodyCr => Self::read_body_cr(src),
            BodyLf => self.read_body_lf(src),
            Trailers => Poll::Ready(Ok(Trailers)),
            End => Poll::Ready(Ok(End)),
        }
    }

    fn read_size(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => return Poll::Ready(Err(ParseError::malformed_chunk("chunk size overflow"))),
                }
            };
        }

        let digit = match try_next_line_byte!(self, src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' if self.size_digits > 0 => return Poll::Ready(Ok(SizeLws)),
            b';' if self.size_digits > 0 => return Poll::Ready(Ok(Extension)),
            b'\r' if self.size_digits > 0 => return Poll::Ready(Ok(SizeLf)),
            b => return Poll::Ready(Err(ParseError::malformed_chunk(format!("invalid chunk size byte {b:#04x}")))),
        };

        self.remaining_size = or_overflow!(self.remaining_size.checked_mul(16));
        self.remaining_size = or_overflow!(self.remaining_size.checked_add(u64::from(digit)));
        self.size_digits += 1;
        Poll::Ready(Ok(Size))
    }

    fn read_size_lws(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_line_byte!(self, src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size linear white space"))),
        }
    }

    fn read_extension(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        // extensions end at the next CRLF; a bare LF inside one is rejected
        match try_next_line_byte!(self, src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ParseError::malformed_chunk("chunk extension contains newline"))),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                self.size_digits = 0;
                self.line_len = 0;
                if self.remaining_size == 0 { Poll::Ready(Ok(Trailers)) } else { Poll::Ready(Ok(Body)) }
            }
            _ => Poll::Ready(Err(ParseError::malformed_chunk("chunk size line not terminated by CRLF"))),
        }
    }

    fn read_body(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(self.remaining_size).unwrap_or(usize::MAX);
        let read_size = remaining.min(src.len());

        self.remaining_size -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if self.remaining_size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("chunk data longer than its size"))),
        }
    }

    fn read_body_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                self.remaining_size = 0;
                Poll::Ready(Ok(Size))
            }
            _ => Poll::Ready(Err(ParseError::malformed_chunk("chunk data not terminated by CRLF"))),
        }
    }
}
