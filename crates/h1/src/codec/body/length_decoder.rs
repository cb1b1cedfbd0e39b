//! Decoder for bodies delimited by `Content-Length`.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out at most `length` bytes, then reports the end of the body.
///
/// Bytes past the declared length are left in the buffer: they belong to the next message
/// on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn is_complete(&self) -> bool {
        self.length == 0
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof(None)));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.length, src.len() as u64);
        let bytes = src.split_to(usize::try_from(len).unwrap_or(usize::MAX)).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"101234567890abcdef\r\n\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(10);
        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(&payload.as_bytes().unwrap()[..], b"1012345678");
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");
        assert!(length_decoder.is_complete());

        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(payload.is_eof());
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");
    }

    #[test]
    fn partial_reads() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut length_decoder = LengthDecoder::new(5);

        assert_eq!(&length_decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap()[..], b"abc");
        assert!(length_decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"de");
        assert_eq!(&length_decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap()[..], b"de");
        assert!(length_decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
