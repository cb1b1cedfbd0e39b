//! Streaming decoder for responses.
//!
//! Unlike a request, a response cannot be framed from its own head: a response to `HEAD` has
//! no body whatever its headers say, and a `2xx` to `CONNECT` starts a tunnel. The decoder is
//! therefore told the method of every request sent, in order, with [`ResponseDecoder::expect`].

use std::collections::VecDeque;

use crate::codec::body::PayloadDecoder;
use crate::codec::framing::response_framing;
use crate::codec::head::ResponseHeadDecoder;
use crate::config::H1Config;
use crate::protocol::{BodyFraming, Message, ParseError, PayloadItem, ResponseHead};
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

#[derive(Debug)]
pub struct ResponseDecoder {
    head_decoder: ResponseHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    pending: VecDeque<Method>,
    config: H1Config,
}

impl ResponseDecoder {
    pub fn new(config: H1Config) -> Self {
        Self {
            head_decoder: ResponseHeadDecoder::new(config.head_limits()),
            payload_decoder: None,
            pending: VecDeque::new(),
            config,
        }
    }

    /// Registers a request that was sent and now awaits its response.
    pub fn expect(&mut self, method: Method) {
        self.pending.push_back(method);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn in_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }

    fn on_payload(&mut self, item: Option<PayloadItem>) -> Option<Message<(ResponseHead, BodyFraming)>> {
        match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof(_)) => {
                self.payload_decoder.take();
                Some(Message::Payload(item))
            }
            None => None,
        }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, BodyFraming)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.on_payload(item));
        }

        if self.pending.is_empty() && !src.is_empty() {
            return Err(ParseError::malformed_head("response received without a pending request"));
        }

        let Some(head) = self.head_decoder.decode(src)? else {
            return Ok(None);
        };

        // interim responses neither carry a body nor answer the request
        if head.is_interim() {
            trace!(status = %head.status(), "interim response");
            return Ok(Some(Message::Header((head, BodyFraming::Empty))));
        }

        let method = self
            .pending
            .pop_front()
            .ok_or_else(|| ParseError::malformed_head("response received without a pending request"))?;
        let framing = response_framing(&head, &method, &self.config)?;
        trace!(%method, ?framing, "response framing");
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
