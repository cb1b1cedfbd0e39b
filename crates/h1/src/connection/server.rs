//! The server side of a connection.
//!
//! Reading and writing are two independent tracks. The read track parses requests as far as
//! the buffered bytes allow, possibly several requests ahead of the responses (pipelining).
//! The write track accepts responses strictly in request order, one exchange at a time:
//!
//! ```text
//! read:   AwaitingHead -> ReadingBody -> AwaitingHead ... -> Finished | Closed
//!                              \-> AwaitingSwitch -> Tunnel
//! write:  WritingHead -> WritingBody -> (done, next exchange)
//! ```

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode, Version};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use crate::codec::framing::{keep_alive, outgoing_response_framing};
use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::config::H1Config;
use crate::connection::pipeline::PipelineQueue;
use crate::connection::wire::Wire;
use crate::connection::{Endpoint, Event};
use crate::ensure;
use crate::protocol::{BodyFraming, HeaderList, Message, ParseError, PayloadItem, RequestHead, ResponseHead, WriteError};
use crate::transport::TransportSignal;

type Response = (ResponseHead, BodyFraming);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    AwaitingHead,
    ReadingBody { seq: u64, switch: bool },
    /// An upgrade or CONNECT request was read; parsing waits for the application's answer.
    AwaitingSwitch { seq: u64 },
    Tunnel,
    /// The peer stopped sending at a message boundary.
    Finished,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    WritingHead,
    WritingBody,
}

/// What the write track needs to know about a request.
#[derive(Debug)]
struct Exchange {
    method: Method,
    version: Version,
    keep_alive: bool,
    upgrade: bool,
    write_state: WriteState,
    close_after: bool,
    switching: bool,
}

/// A sans-io HTTP/1.1 server connection.
///
/// Feed it received bytes, pull [`Event`]s with [`poll_event`](Self::poll_event), answer
/// each request with `write_head`, `write_body` and `finish_body`, and hand whatever
/// [`poll_output`](Self::poll_output) returns to the transport.
#[derive(Debug)]
pub struct ServerConnection {
    config: H1Config,
    wire: Wire,
    decoder: RequestDecoder,
    encoder: ResponseEncoder,
    read_state: ReadState,
    pipeline: PipelineQueue,
    exchanges: HashMap<u64, Exchange>,
    body_size: u64,
    /// No further request heads are parsed.
    closing: bool,
}

impl ServerConnection {
    pub fn new(config: H1Config) -> Self {
        Self {
            config,
            wire: Wire::new(&config),
            decoder: RequestDecoder::new(config),
            encoder: ResponseEncoder::new(),
            read_state: ReadState::AwaitingHead,
            pipeline: PipelineQueue::new(),
            exchanges: HashMap::new(),
            body_size: 0,
            closing: false,
        }
    }

    pub fn config(&self) -> &H1Config {
        &self.config
    }

    /// Exchanges read but not yet fully answered.
    pub fn in_flight(&self) -> usize {
        self.pipeline.len()
    }

    pub fn is_closed(&self) -> bool {
        self.read_state == ReadState::Closed
    }

    pub fn is_tunnel(&self) -> bool {
        self.read_state == ReadState::Tunnel
    }

    /// Whether the peer has ended its input.
    ///
    /// In a tunnel, `poll_event` returning `None` with this set means the peer closed its side.
    pub fn is_eof(&self) -> bool {
        self.wire.is_eof()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        if self.read_state == ReadState::Closed {
            trace!(len = bytes.len(), "connection closed, drop received bytes");
            return;
        }
        self.wire.feed(bytes);
    }

    pub fn feed_eof(&mut self) {
        self.wire.feed_eof();
    }

    /// Parses the next event from the buffered bytes.
    ///
    /// `Ok(None)` means more input (or an answer from the application) is needed. A parse
    /// error is returned once; the connection is closed afterwards and yields no more events.
    pub fn poll_event(&mut self) -> Result<Option<Event<RequestHead>>, ParseError> {
        let reading = match self.read_state {
            ReadState::ReadingBody { seq, .. } => Some(seq),
            _ => None,
        };

        let result = self.next_event();
        self.wire.observe();

        if let Err(e) = &result {
            self.fail(reading, e);
        }
        result
    }

    pub fn poll_output(&mut self) -> Option<Bytes> {
        self.wire.poll_output()
    }

    pub fn poll_signal(&mut self) -> Option<TransportSignal> {
        self.wire.poll_signal()
    }

    fn next_event(&mut self) -> Result<Option<Event<RequestHead>>, ParseError> {
        match self.read_state {
            ReadState::AwaitingHead => self.read_head(),
            ReadState::ReadingBody { seq, switch } => self.read_body(seq, switch),
            ReadState::Tunnel => Ok(self.wire.take_input().map(Event::Tunnel)),
            ReadState::AwaitingSwitch { .. } | ReadState::Finished | ReadState::Closed => Ok(None),
        }
    }

    fn decode(&mut self) -> Result<Option<Message<(RequestHead, BodyFraming)>>, ParseError> {
        if self.wire.is_eof() {
            self.decoder.decode_eof(self.wire.input())
        } else {
            self.decoder.decode(self.wire.input())
        }
    }

    fn read_head(&mut self) -> Result<Option<Event<RequestHead>>, ParseError> {
        if self.closing {
            return Ok(None);
        }

        match self.decode()? {
            Some(Message::Header((head, framing))) => {
                let keep_alive = keep_alive(head.version(), head.headers());
                let switch = head.is_protocol_switch();
                let seq = self.pipeline.push();
                debug!(seq, method = %head.method(), target = head.target(), ?framing, keep_alive, "request head");

                self.exchanges.insert(
                    seq,
                    Exchange {
                        method: head.method().clone(),
                        version: head.version(),
                        keep_alive,
                        upgrade: head.is_upgrade(),
                        write_state: WriteState::WritingHead,
                        close_after: false,
                        switching: false,
                    },
                );
                self.body_size = 0;
                self.read_state = ReadState::ReadingBody { seq, switch };
                if !keep_alive {
                    self.closing = true;
                }
                Ok(Some(Event::Head { seq, head }))
            }
            Some(Message::Payload(_)) => Err(ParseError::malformed_head("body bytes without a request head")),
            None if self.wire.head_overflow() => {
                Err(ParseError::head_too_large(format!("head exceeds {} bytes", self.config.max_head_size())))
            }
            None => {
                if self.wire.is_eof() && self.wire.input_len() == 0 {
                    debug!(in_flight = self.pipeline.len(), "peer finished sending requests");
                    self.read_state = ReadState::Finished;
                    if self.pipeline.is_empty() {
                        self.wire.close_after_flush();
                    }
                }
                Ok(None)
            }
        }
    }

    fn read_body(&mut self, seq: u64, switch: bool) -> Result<Option<Event<RequestHead>>, ParseError> {
        match self.decode()? {
            Some(Message::Payload(PayloadItem::Chunk(data))) => {
                self.body_size += data.len() as u64;
                ensure!(
                    self.body_size <= self.config.max_body_size(),
                    ParseError::body_too_large(self.body_size, self.config.max_body_size())
                );
                trace!(seq, len = data.len(), "request body data");
                Ok(Some(Event::Data { seq, data }))
            }
            Some(Message::Payload(PayloadItem::Eof(trailers))) => {
                // a switch already rejected by a finished response resumes parsing right away
                self.read_state = if switch && self.exchanges.contains_key(&seq) {
                    ReadState::AwaitingSwitch { seq }
                } else {
                    ReadState::AwaitingHead
                };
                debug!(seq, body_size = self.body_size, state = ?self.read_state, "request complete");
                Ok(Some(Event::End { seq, trailers }))
            }
            Some(Message::Header(_)) => Err(ParseError::malformed_head("request head inside a body")),
            None => Ok(None),
        }
    }

    fn fail(&mut self, reading: Option<u64>, e: &ParseError) {
        warn!(cause = %e, "fatal parse error, closing connection");
        self.read_state = ReadState::Closed;
        self.closing = true;
        self.wire.discard_input();

        // a request that failed before its response started gets no response at all
        if let Some(seq) = reading {
            let unanswered = self.exchanges.get(&seq).is_some_and(|ex| ex.write_state == WriteState::WritingHead);
            if unanswered && self.pipeline.discard(seq) {
                self.exchanges.remove(&seq);
            }
        }

        if self.pipeline.is_empty() {
            if self.config.error_response() {
                self.write_error_response(e.status_code());
            }
            self.wire.close_after_flush();
        }
    }

    fn write_error_response(&mut self, status: StatusCode) {
        let head = ResponseHead::new(status).with_header("Connection", "close");
        let result = self
            .encoder
            .encode(Message::<Response>::Header((head, BodyFraming::Length(0))), self.wire.output())
            .and_then(|_| self.encoder.encode(Message::<Response>::Payload(PayloadItem::Eof(None)), self.wire.output()));

        match result {
            Ok(()) => debug!(%status, "error response written"),
            Err(e) => error!(cause = %e, "failed to write error response"),
        }
    }

    /// Writes the response head of exchange `seq`.
    ///
    /// `1xx` heads other than `101` are interim and may be written any number of times before
    /// the final head. The framing headers of the final head decide how the body is encoded;
    /// `Connection` is adjusted to the keep-alive decision.
    pub fn write_head(&mut self, seq: u64, head: ResponseHead) -> Result<(), WriteError> {
        let result = self.do_write_head(seq, head);
        if let Err(e) = &result {
            error!(seq, cause = %e, "response head rejected");
        }
        result
    }

    fn do_write_head(&mut self, seq: u64, mut head: ResponseHead) -> Result<(), WriteError> {
        self.pipeline.check_turn(seq)?;
        let exchange = self
            .exchanges
            .get_mut(&seq)
            .ok_or_else(|| WriteError::invalid_write_state(format!("no exchange {seq} is awaiting a response")))?;
        ensure!(
            exchange.write_state == WriteState::WritingHead,
            WriteError::invalid_write_state(format!("response head of exchange {seq} already written"))
        );

        if head.is_interim() {
            ensure!(
                exchange.version == Version::HTTP_11,
                WriteError::invalid_head("interim responses require an HTTP/1.1 request")
            );
            self.encoder.encode(Message::<Response>::Header((head, BodyFraming::Empty)), self.wire.output())?;
            self.encoder.encode(Message::<Response>::Payload(PayloadItem::Eof(None)), self.wire.output())?;
            debug!(seq, "interim response written");
            return Ok(());
        }

        let status = head.status();
        let switching = if status == StatusCode::SWITCHING_PROTOCOLS {
            ensure!(exchange.upgrade, WriteError::invalid_head("101 answers an upgrade request only"));
            true
        } else {
            exchange.method == Method::CONNECT && status.is_success()
        };
        if switching {
            ensure!(
                self.read_state == ReadState::AwaitingSwitch { seq },
                WriteError::invalid_write_state("protocol switch before the request was fully read")
            );
        }

        let framing = outgoing_response_framing(&head, &exchange.method, exchange.version)?;
        let last = self.closing && self.pipeline.len() == 1;
        let close = !switching
            && (!exchange.keep_alive || last || framing.is_until_close() || head.headers().has_token("connection", "close"));

        if close {
            if !head.headers().has_token("connection", "close") {
                head.headers_mut().insert("Connection", "close");
            }
        } else if !switching && exchange.version == Version::HTTP_10 && !head.headers().contains("connection") {
            head.headers_mut().append("Connection", "keep-alive");
        }

        self.encoder.encode(Message::<Response>::Header((head, framing)), self.wire.output())?;
        exchange.write_state = WriteState::WritingBody;
        exchange.close_after = close;
        exchange.switching = switching;
        if close {
            self.closing = true;
        }
        debug!(seq, %status, ?framing, close, switching, "response head written");
        Ok(())
    }

    /// Writes `100 Continue` for a request that asked for it.
    pub fn write_continue(&mut self, seq: u64) -> Result<(), WriteError> {
        self.write_head(seq, ResponseHead::new(StatusCode::CONTINUE))
    }

    pub fn write_body(&mut self, seq: u64, data: Bytes) -> Result<(), WriteError> {
        let result = self.body_turn(seq).and_then(|_| {
            self.encoder.encode(Message::<Response>::Payload(PayloadItem::Chunk(data)), self.wire.output())
        });
        if let Err(e) = &result {
            error!(seq, cause = %e, "response body rejected");
        }
        result
    }

    /// Completes the response of exchange `seq`, with trailers for a chunked body.
    pub fn finish_body(&mut self, seq: u64, trailers: Option<HeaderList>) -> Result<(), WriteError> {
        let result = self.do_finish_body(seq, trailers);
        if let Err(e) = &result {
            error!(seq, cause = %e, "finishing response rejected");
        }
        result
    }

    fn do_finish_body(&mut self, seq: u64, trailers: Option<HeaderList>) -> Result<(), WriteError> {
        self.body_turn(seq)?;
        self.encoder.encode(Message::<Response>::Payload(PayloadItem::Eof(trailers)), self.wire.output())?;

        self.pipeline.complete(seq)?;
        let Some(exchange) = self.exchanges.remove(&seq) else {
            return Err(WriteError::invalid_write_state(format!("no exchange {seq} is awaiting a response")));
        };
        debug!(seq, in_flight = self.pipeline.len(), "response complete");

        if exchange.switching {
            debug!(seq, "switching protocols, connection is a tunnel now");
            self.read_state = ReadState::Tunnel;
            return Ok(());
        }

        if self.read_state == (ReadState::AwaitingSwitch { seq }) {
            self.read_state = ReadState::AwaitingHead;
        }

        if exchange.close_after || (self.closing && self.pipeline.is_empty()) {
            self.shutdown();
        } else if self.read_state == ReadState::Finished && self.pipeline.is_empty() {
            self.wire.close_after_flush();
        }
        Ok(())
    }

    fn body_turn(&self, seq: u64) -> Result<(), WriteError> {
        self.pipeline.check_turn(seq)?;
        let writing_body = self.exchanges.get(&seq).is_some_and(|ex| ex.write_state == WriteState::WritingBody);
        ensure!(writing_body, WriteError::invalid_write_state(format!("response head of exchange {seq} not written yet")));
        Ok(())
    }

    /// Writes raw bytes once the connection is a tunnel.
    pub fn write_tunnel(&mut self, data: Bytes) -> Result<(), WriteError> {
        ensure!(self.read_state == ReadState::Tunnel, WriteError::invalid_write_state("connection is not a tunnel"));
        self.wire.output().extend_from_slice(&data);
        Ok(())
    }

    /// Stops parsing requests and closes once the in-flight responses are written.
    pub fn close(&mut self) {
        debug!(in_flight = self.pipeline.len(), "close requested");
        self.closing = true;
        if self.pipeline.is_empty() || self.read_state == ReadState::Tunnel {
            self.shutdown();
        }
    }

    /// Drops all buffered state and closes immediately.
    pub fn abort(&mut self) {
        debug!(in_flight = self.pipeline.len(), "connection aborted");
        self.wire.abort();
        self.shutdown();
        self.encoder = ResponseEncoder::new();
    }

    fn shutdown(&mut self) {
        self.read_state = ReadState::Closed;
        self.closing = true;
        self.pipeline.clear();
        self.exchanges.clear();
        self.wire.close_after_flush();
    }
}

impl Endpoint for ServerConnection {
    type Head = RequestHead;

    fn feed(&mut self, bytes: &[u8]) {
        ServerConnection::feed(self, bytes)
    }

    fn feed_eof(&mut self) {
        ServerConnection::feed_eof(self)
    }

    fn poll_event(&mut self) -> Result<Option<Event<RequestHead>>, ParseError> {
        ServerConnection::poll_event(self)
    }

    fn poll_output(&mut self) -> Option<Bytes> {
        ServerConnection::poll_output(self)
    }

    fn poll_signal(&mut self) -> Option<TransportSignal> {
        ServerConnection::poll_signal(self)
    }
}

/// Collects everything the connection wants to send.
#[cfg(test)]
pub(crate) fn drain_output(conn: &mut ServerConnection) -> BytesMut {
    let mut out = BytesMut::new();
    while let Some(bytes) = conn.poll_output() {
        out.extend_from_slice(&bytes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(s: &str) -> String {
        s.replace('\n', "\r\n")
    }

    fn events(conn: &mut ServerConnection) -> Vec<Event<RequestHead>> {
        std::iter::from_fn(|| conn.poll_event().unwrap()).collect()
    }

    #[test]
    fn simple_exchange() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(crlf(indoc! {r##"
        GET /index.html HTTP/1.1
        Host: example.com

        "##})
        .as_bytes());

        let events = events(&mut conn);
        assert_eq!(events.len(), 2);
        let Event::Head { seq, head } = &events[0] else { panic!("expect head") };
        assert_eq!(head.target(), "/index.html");
        assert_eq!(events[1], Event::End { seq: *seq, trailers: None });

        conn.write_head(*seq, ResponseHead::new(StatusCode::OK)).unwrap();
        conn.write_body(*seq, Bytes::from_static(b"hi")).unwrap();
        conn.finish_body(*seq, None).unwrap();

        assert_eq!(
            &drain_output(&mut conn)[..],
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nhi\r\n0\r\n\r\n"
        );
        assert_eq!(conn.poll_signal(), None);
        assert_eq!(conn.in_flight(), 0);
    }

    #[test]
    fn write_calls_out_of_order() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\n\r\n");
        let seq = events(&mut conn)[0].seq().unwrap();

        assert!(matches!(conn.write_body(seq, Bytes::from_static(b"x")), Err(WriteError::InvalidWriteState { .. })));
        assert!(matches!(conn.finish_body(seq, None), Err(WriteError::InvalidWriteState { .. })));

        conn.write_head(seq, ResponseHead::new(StatusCode::NO_CONTENT)).unwrap();
        assert!(matches!(conn.write_head(seq, ResponseHead::new(StatusCode::OK)), Err(WriteError::InvalidWriteState { .. })));
        assert!(matches!(conn.write_body(seq, Bytes::from_static(b"x")), Err(WriteError::InvalidWriteState { .. })));
        conn.finish_body(seq, None).unwrap();

        assert!(!conn.is_closed());
    }

    #[test]
    fn http10_keep_alive_is_echoed() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
        let seq = events(&mut conn)[0].seq().unwrap();

        conn.write_head(seq, ResponseHead::new(StatusCode::OK).with_header("Content-Length", "2")).unwrap();
        conn.write_body(seq, Bytes::from_static(b"ok")).unwrap();
        conn.finish_body(seq, None).unwrap();

        assert_eq!(
            &drain_output(&mut conn)[..],
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: keep-alive\r\n\r\nok"
        );
        assert!(!conn.is_closed());
    }

    #[test]
    fn http10_without_keep_alive_closes() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.0\r\n\r\nGET /ignored HTTP/1.0\r\n\r\n");
        let events = events(&mut conn);
        assert_eq!(events.len(), 2);
        let seq = events[0].seq().unwrap();

        conn.write_head(seq, ResponseHead::new(StatusCode::OK)).unwrap();
        conn.write_body(seq, Bytes::from_static(b"raw")).unwrap();
        conn.finish_body(seq, None).unwrap();

        assert_eq!(&drain_output(&mut conn)[..], b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nraw");
        assert_eq!(conn.poll_signal(), Some(TransportSignal::Close));
        assert!(conn.is_closed());
    }

    #[test]
    fn expect_continue() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"POST /upload HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 3\r\n\r\n");
        let Some(Event::Head { seq, head }) = conn.poll_event().unwrap() else { panic!("expect head") };
        assert!(head.expects_continue());
        assert!(conn.poll_event().unwrap().is_none());

        conn.write_continue(seq).unwrap();
        assert_eq!(&drain_output(&mut conn)[..], b"HTTP/1.1 100 Continue\r\n\r\n");

        conn.feed(b"abc");
        assert_eq!(conn.poll_event().unwrap(), Some(Event::Data { seq, data: Bytes::from_static(b"abc") }));
        assert!(conn.poll_event().unwrap().unwrap().is_end());
    }

    #[test]
    fn bad_request_gets_an_error_response() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n");

        assert!(matches!(conn.poll_event(), Err(ParseError::MalformedHead { .. })));
        assert!(conn.poll_event().unwrap().is_none());
        assert!(conn.is_closed());

        assert_eq!(
            &drain_output(&mut conn)[..],
            b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        );
        assert_eq!(conn.poll_signal(), Some(TransportSignal::Close));
    }

    #[test]
    fn body_ceiling() {
        let mut conn = ServerConnection::new(H1Config::default().with_max_body_size(8));
        conn.feed(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n");

        assert!(matches!(conn.poll_event().unwrap(), Some(Event::Head { .. })));
        assert!(matches!(conn.poll_event().unwrap(), Some(Event::Data { .. })));
        assert!(matches!(conn.poll_event(), Err(ParseError::BodyTooLarge { size: 10, max_size: 8 })));
        assert!(drain_output(&mut conn).starts_with(b"HTTP/1.1 413 "));
    }

    #[test]
    fn upgrade_switches_to_tunnel() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(crlf(indoc! {r##"
        GET /chat HTTP/1.1
        Host: example.com
        Upgrade: websocket
        Connection: Upgrade

        raw"##})
        .as_bytes());

        let events = events(&mut conn);
        assert_eq!(events.len(), 2);
        let seq = events[0].seq().unwrap();

        let response = ResponseHead::new(StatusCode::SWITCHING_PROTOCOLS)
            .with_header("Upgrade", "websocket")
            .with_header("Connection", "Upgrade");
        conn.write_head(seq, response).unwrap();
        assert!(matches!(conn.write_tunnel(Bytes::from_static(b"early")), Err(WriteError::InvalidWriteState { .. })));
        conn.finish_body(seq, None).unwrap();
        assert!(conn.is_tunnel());

        assert_eq!(conn.poll_event().unwrap(), Some(Event::Tunnel(Bytes::from_static(b"raw"))));
        conn.write_tunnel(Bytes::from_static(b"pong")).unwrap();
        assert!(drain_output(&mut conn).ends_with(b"\r\n\r\npong"));

        assert_eq!(conn.poll_event().unwrap(), None);
        assert!(!conn.is_eof());
        conn.feed(b"bye");
        conn.feed_eof();
        assert_eq!(conn.poll_event().unwrap(), Some(Event::Tunnel(Bytes::from_static(b"bye"))));
        assert_eq!(conn.poll_event().unwrap(), None);
        assert!(conn.is_eof());
    }

    #[test]
    fn rejected_upgrade_resumes_parsing() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\nUpgrade: h2c\r\nConnection: upgrade\r\n\r\nGET /next HTTP/1.1\r\n\r\n");

        let events = events(&mut conn);
        assert_eq!(events.len(), 2);
        let seq = events[0].seq().unwrap();

        conn.write_head(seq, ResponseHead::new(StatusCode::OK).with_header("Content-Length", "0")).unwrap();
        conn.finish_body(seq, None).unwrap();

        let Some(Event::Head { head, .. }) = conn.poll_event().unwrap() else { panic!("expect head") };
        assert_eq!(head.target(), "/next");
    }

    #[test]
    fn switching_protocols_needs_an_upgrade_request() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\n\r\n");
        let seq = events(&mut conn)[0].seq().unwrap();

        assert!(matches!(
            conn.write_head(seq, ResponseHead::new(StatusCode::SWITCHING_PROTOCOLS)),
            Err(WriteError::InvalidHead { .. })
        ));
    }

    #[test]
    fn eof_between_requests_closes_after_response() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\n\r\n");
        conn.feed_eof();

        let events = events(&mut conn);
        assert_eq!(events.len(), 2);
        assert_eq!(conn.poll_signal(), None);

        let seq = events[0].seq().unwrap();
        conn.write_head(seq, ResponseHead::new(StatusCode::NO_CONTENT)).unwrap();
        conn.finish_body(seq, None).unwrap();
        drain_output(&mut conn);
        assert_eq!(conn.poll_signal(), Some(TransportSignal::Close));
    }

    #[test]
    fn eof_inside_body() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc");
        conn.feed_eof();

        assert!(matches!(conn.poll_event().unwrap(), Some(Event::Head { .. })));
        assert!(matches!(conn.poll_event().unwrap(), Some(Event::Data { .. })));
        assert!(matches!(conn.poll_event(), Err(ParseError::UnexpectedEof)));
    }

    #[test]
    fn abort_discards_everything() {
        let mut conn = ServerConnection::new(H1Config::default());
        conn.feed(b"GET / HTTP/1.1\r\n\r\n");
        let seq = events(&mut conn)[0].seq().unwrap();
        conn.write_head(seq, ResponseHead::new(StatusCode::OK)).unwrap();

        conn.abort();
        assert!(conn.poll_output().is_none());
        assert_eq!(conn.poll_signal(), Some(TransportSignal::Close));
        assert!(matches!(conn.finish_body(seq, None), Err(WriteError::InvalidWriteState { .. })));
    }
}
