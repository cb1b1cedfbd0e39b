use crate::protocol::HeaderList;
use bytes::{Buf, Bytes};

/// One step of an HTTP message as the codecs see it: the head, then payload items.
///
/// `T` is the head type (usually paired with its [`BodyFraming`]), `Data` the payload chunk
/// type.
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<Data>),
}

/// A piece of a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// Body bytes, in the order they appear on the wire.
    Chunk(Data),
    /// The body is complete. Trailers are only ever present for chunked bodies.
    Eof(Option<HeaderList>),
}

/// How the end of a body is found.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body is permitted.
    Empty,
    /// Exactly this many bytes follow the head.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// The body ends when the connection does. Only valid for responses.
    UntilClose,
}

impl BodyFraming {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, BodyFraming::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BodyFraming::Empty | BodyFraming::Length(0))
    }

    #[inline]
    pub fn is_until_close(&self) -> bool {
        matches!(self, BodyFraming::UntilClose)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof(_))
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    /// Trailers of a finished chunked body, if any were sent.
    pub fn trailers(&self) -> Option<&HeaderList> {
        match self {
            PayloadItem::Chunk(_) => None,
            PayloadItem::Eof(trailers) => trailers.as_ref(),
        }
    }
}
