//! Streaming decoder for requests.
//!
//! [`RequestDecoder`] alternates between two phases: decoding a head with
//! [`RequestHeadDecoder`], then the body with a [`PayloadDecoder`] chosen from the head's
//! framing. The phase is carried by `payload_decoder`:
//!
//! - `None`: waiting for the next request head
//! - `Some(_)`: decoding the body of the last head
//!
//! ```
//! use bytes::BytesMut;
//! use micro_h1::codec::RequestDecoder;
//! use micro_h1::config::H1Config;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new(H1Config::default());
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"[..]);
//! let message = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(message.is_header());
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::framing::request_framing;
use crate::codec::head::RequestHeadDecoder;
use crate::config::H1Config;
use crate::protocol::{BodyFraming, Message, ParseError, PayloadItem, RequestHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

#[derive(Debug)]
pub struct RequestDecoder {
    head_decoder: RequestHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    config: H1Config,
}

impl RequestDecoder {
    pub fn new(config: H1Config) -> Self {
        Self { head_decoder: RequestHeadDecoder::new(config.head_limits()), payload_decoder: None, config }
    }

    /// Whether a body is being decoded.
    pub fn in_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }

    fn on_payload(&mut self, item: Option<PayloadItem>) -> Option<Message<(RequestHead, BodyFraming)>> {
        match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof(_)) => {
                // the next bytes belong to the next request
                self.payload_decoder.take();
                Some(Message::Payload(item))
            }
            None => None,
        }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, BodyFraming)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.on_payload(item));
        }

        let Some(head) = self.head_decoder.decode(src)? else {
            return Ok(None);
        };

        let framing = request_framing(&head, &self.config)?;
        trace!(?framing, "request framing");
        self.payload_decoder = Some(PayloadDecoder::from_framing(framing, self.config.head_limits()));
        Ok(Some(Message::Header((head, framing))))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.on_payload(item));
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use indoc::indoc;

    fn crlf(s: &str) -> BytesMut {
        BytesMut::from(s.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn pipelined_requests() {
        let mut src = crlf(indoc! {r##"
        POST /submit HTTP/1.1
        Host: example.com
        Content-Length: 5

        helloGET /next HTTP/1.1
        Host: example.com

        "##});

        let mut decoder = RequestDecoder::new(H1Config::default());

        let Message::Header((head, framing)) = decoder.decode(&mut src).unwrap().unwrap() else { panic!("expect head") };
        assert_eq!(head.method(), &Method::POST);
        assert_eq!(framing, BodyFraming::Length(5));
        assert!(decoder.in_payload());

        let item = decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"hello")));
        let item = decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap();
        assert_eq!(item, PayloadItem::Eof(None));
        assert!(!decoder.in_payload());

        let Message::Header((head, framing)) = decoder.decode(&mut src).unwrap().unwrap() else { panic!("expect head") };
        assert_eq!(head.target(), "/next");
        assert_eq!(framing, BodyFraming::Empty);
        assert!(decoder.decode(&mut src).unwrap().unwrap().into_payload_item().unwrap().is_eof());
        assert!(decoder.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn framing_conflict_yields_no_body() {
        let mut src = crlf(indoc! {r##"
        POST / HTTP/1.1
        Content-Length: 4
        Transfer-Encoding: chunked

        4
        Wiki
        0

        "##});

        let mut decoder = RequestDecoder::new(H1Config::default());
        assert!(matches!(decoder.decode(&mut src), Err(ParseError::FramingConflict { .. })));
        assert!(!decoder.in_payload());
    }

    #[test]
    fn eof_inside_head_is_unexpected() {
        let mut decoder = RequestDecoder::new(H1Config::default());

        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHo"[..]);
        assert!(matches!(decoder.decode_eof(&mut src), Err(ParseError::UnexpectedEof)));

        let mut src = BytesMut::new();
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }
}
