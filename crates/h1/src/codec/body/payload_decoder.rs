//! A single decoder for every body framing.
//!
//! The framing of a message is decided once from its head, so the strategy is a plain enum
//! rather than a trait object.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::config::HeadLimits;
use crate::protocol::{BodyFraming, ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Everything until the peer closes the connection
    UntilClose { finished: bool },
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked(limits: HeadLimits) -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new(limits)) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose { finished: false } }
    }

    pub fn from_framing(framing: BodyFraming, limits: HeadLimits) -> Self {
        match framing {
            BodyFraming::Empty => Self::empty(),
            BodyFraming::Length(size) => Self::fix_length(size),
            BodyFraming::Chunked => Self::chunked(limits),
            BodyFraming::UntilClose => Self::until_close(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Whether the whole body has been decoded.
    pub fn is_complete(&self) -> bool {
        match &self.kind {
            Kind::Length(decoder) => decoder.is_complete(),
            Kind::Chunked(decoder) => decoder.is_complete(),
            Kind::UntilClose { finished } => *finished,
            Kind::NoBody => true,
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilClose { finished: false } if !src.is_empty() => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
            Kind::UntilClose { .. } => Ok(None),
            Kind::NoBody => Ok(Some(PayloadItem::Eof(None))),
        }
    }

    /// The peer closed the connection.
    ///
    /// This completes a close-delimited body; any other body that is still incomplete is
    /// truncated and reported as [`ParseError::UnexpectedEof`].
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Kind::UntilClose { finished } = &mut self.kind {
            if *finished {
                return Ok(None);
            }
            if !src.is_empty() {
                return Ok(Some(PayloadItem::Chunk(src.split().freeze())));
            }
            *finished = true;
            return Ok(Some(PayloadItem::Eof(None)));
        }

        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if self.is_complete() => Ok(None),
            None => Err(ParseError::UnexpectedEof),
        }
    }
}
