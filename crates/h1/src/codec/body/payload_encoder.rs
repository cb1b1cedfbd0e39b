//! A single encoder for every body framing.

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::ensure;
use crate::protocol::{BodyFraming, PayloadItem, WriteError};
use bytes::{Buf, BufMut, BytesMut};

use tokio_util::codec::Encoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    /// Raw bytes, the connection closes afterwards
    UntilClose { finished: bool },
    NoBody { finished: bool },
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody { finished: false } }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose { finished: false } }
    }

    pub fn from_framing(framing: BodyFraming) -> Self {
        match framing {
            BodyFraming::Empty => Self::empty(),
            BodyFraming::Length(size) => Self::fix_length(size),
            BodyFraming::Chunked => Self::chunked(),
            BodyFraming::UntilClose => Self::until_close(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::Chunked(encoder) => encoder.is_finish(),
            Kind::UntilClose { finished } | Kind::NoBody { finished } => *finished,
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = WriteError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::UntilClose { finished } | Kind::NoBody { finished } if *finished => {
                Err(WriteError::invalid_write_state("body already finished"))
            }
            Kind::UntilClose { finished } => match item {
                PayloadItem::Chunk(bytes) => {
                    dst.put(bytes);
                    Ok(())
                }
                PayloadItem::Eof(trailers) => {
                    ensure!(trailers.is_none_or(|t| t.is_empty()), WriteError::invalid_write_state("trailers require a chunked body"));
                    *finished = true;
                    Ok(())
                }
            },
            Kind::NoBody { finished } => match item {
                PayloadItem::Chunk(bytes) => {
                    ensure!(!bytes.has_remaining(), WriteError::invalid_write_state("message does not permit a body"));
                    Ok(())
                }
                PayloadItem::Eof(trailers) => {
                    ensure!(trailers.is_none_or(|t| t.is_empty()), WriteError::invalid_write_state("trailers require a chunked body"));
                    *finished = true;
                    Ok(())
                }
            },
        }
    }
}
