//! The client side of a connection.

use bytes::Bytes;
use http::{Method, StatusCode, Version};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use crate::codec::framing::{is_ambiguous, keep_alive, outgoing_request_framing};
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::config::H1Config;
use crate::connection::pipeline::PipelineQueue;
use crate::connection::wire::Wire;
use crate::connection::{Endpoint, Event};
use crate::ensure;
use crate::protocol::{BodyFraming, HeaderList, Message, ParseError, PayloadItem, RequestHead, ResponseHead, WriteError};
use crate::transport::TransportSignal;

type Request = (RequestHead, BodyFraming);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    AwaitingHead,
    ReadingBody { seq: u64, keep_alive: bool, switching: bool },
    Tunnel,
    Closed,
}

/// A request that asked to switch protocols.
#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    seq: u64,
    connect: bool,
}

/// A sans-io HTTP/1.1 client connection.
///
/// Requests are written with [`write_head`](Self::write_head), which hands out the sequence
/// number their response events will carry. Requests may be pipelined: a new head can be
/// written as soon as the previous body is finished.
#[derive(Debug)]
pub struct ClientConnection {
    config: H1Config,
    wire: Wire,
    decoder: ResponseDecoder,
    encoder: RequestEncoder,
    read_state: ReadState,
    /// Requests sent and awaiting their response, in order.
    pipeline: PipelineQueue,
    writing: Option<u64>,
    pending_switch: Option<PendingSwitch>,
    body_size: u64,
    /// No further requests may be written.
    closing: bool,
}

impl ClientConnection {
    pub fn new(config: H1Config) -> Self {
        Self {
            config,
            wire: Wire::new(&config),
            decoder: ResponseDecoder::new(config),
            encoder: RequestEncoder::new(),
            read_state: ReadState::AwaitingHead,
            pipeline: PipelineQueue::new(),
            writing: None,
            pending_switch: None,
            body_size: 0,
            closing: false,
        }
    }

    pub fn config(&self) -> &H1Config {
        &self.config
    }

    /// Requests whose response has not been fully read.
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

    /// Parses the next response event from the buffered bytes.
    ///
    /// A parse error is returned once; the connection is closed afterwards.
    pub fn poll_event(&mut self) -> Result<Option<Event<ResponseHead>>, ParseError> {
        let result = self.next_event();
        self.wire.observe();

        if let Err(e) = &result {
            warn!(cause = %e, "fatal parse error, closing connection");
            self.wire.discard_input();
            self.shutdown();
        }
        result
    }

    pub fn poll_output(&mut self) -> Option<Bytes> {
        self.wire.poll_output()
    }

    pub fn poll_signal(&mut self) -> Option<TransportSignal> {
        self.wire.poll_signal()
    }

    fn next_event(&mut self) -> Result<Option<Event<ResponseHead>>, ParseError> {
        match self.read_state {
            ReadState::AwaitingHead => self.read_head(),
            ReadState::ReadingBody { seq, keep_alive, switching } => self.read_body(seq, keep_alive, switching),
            ReadState::Tunnel => Ok(self.wire.take_input().map(Event::Tunnel)),
            ReadState::Closed => Ok(None),
        }
    }

    fn decode(&mut self) -> Result<Option<Message<(ResponseHead, BodyFraming)>>, ParseError> {
        if self.wire.is_eof() {
            self.decoder.decode_eof(self.wire.input())
        } else {
            self.decoder.decode(self.wire.input())
        }
    }

    fn read_head(&mut self) -> Result<Option<Event<ResponseHead>>, ParseError> {
        match self.decode()? {
            Some(Message::Header((head, framing))) => {
                let Some(seq) = self.pipeline.front() else {
                    return Err(ParseError::malformed_head("response received without a pending request"));
                };

                if head.is_interim() {
                    debug!(seq, status = %head.status(), "interim response");
                    return Ok(Some(Event::Informational { seq, head }));
                }

                let switching = match self.pending_switch {
                    Some(switch) if switch.seq == seq => {
                        if switch.connect { head.status().is_success() } else { head.status() == StatusCode::SWITCHING_PROTOCOLS }
                    }
                    _ => false,
                };
                ensure!(
                    switching || head.status() != StatusCode::SWITCHING_PROTOCOLS,
                    ParseError::malformed_head("101 response to a request that did not ask to upgrade")
                );

                let keep_alive =
                    keep_alive(head.version(), head.headers()) && !is_ambiguous(head.headers()) && !framing.is_until_close();
                debug!(seq, status = %head.status(), ?framing, keep_alive, switching, "response head");

                self.body_size = 0;
                self.read_state = ReadState::ReadingBody { seq, keep_alive, switching };
                Ok(Some(Event::Head { seq, head }))
            }
            Some(Message::Payload(_)) => Err(ParseError::malformed_head("body bytes without a response head")),
            None if self.wire.head_overflow() => {
                Err(ParseError::head_too_large(format!("head exceeds {} bytes", self.config.max_head_size())))
            }
            None if self.wire.is_eof() && self.wire.input_len() == 0 => {
                ensure!(self.pipeline.is_empty(), ParseError::UnexpectedEof);
                debug!("server finished sending responses");
                self.shutdown();
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn read_body(&mut self, seq: u64, keep_alive: bool, switching: bool) -> Result<Option<Event<ResponseHead>>, ParseError> {
        match self.decode()? {
            Some(Message::Payload(PayloadItem::Chunk(data))) => {
                self.body_size += data.len() as u64;
                ensure!(
                    self.body_size <= self.config.max_body_size(),
                    ParseError::body_too_large(self.body_size, self.config.max_body_size())
                );
                trace!(seq, len = data.len(), "response body data");
                Ok(Some(Event::Data { seq, data }))
            }
            Some(Message::Payload(PayloadItem::Eof(trailers))) => {
                self.pipeline.pop_front();
                if self.pending_switch.is_some_and(|switch| switch.seq == seq) {
                    self.pending_switch = None;
                }

                if switching {
                    debug!(seq, "switching protocols, connection is a tunnel now");
                    self.read_state = ReadState::Tunnel;
                } else if !keep_alive || (self.closing && self.pipeline.is_empty() && self.writing.is_none()) {
                    self.shutdown();
                } else {
                    self.read_state = ReadState::AwaitingHead;
                }
                debug!(seq, body_size = self.body_size, "response complete");
                Ok(Some(Event::End { seq, trailers }))
            }
            Some(Message::Header(_)) => Err(ParseError::malformed_head("response head inside a body")),
            None => Ok(None),
        }
    }

    /// Writes a request head and returns the sequence number of its exchange.
    ///
    /// HTTP/1.0 requests without a `Connection` header get `Connection: keep-alive`.
    pub fn write_head(&mut self, head: RequestHead) -> Result<u64, WriteError> {
        let result = self.do_write_head(head);
        if let Err(e) = &result {
            error!(cause = %e, "request head rejected");
        }
        result
    }

    fn do_write_head(&mut self, mut head: RequestHead) -> Result<u64, WriteError> {
        ensure!(
            !self.closing && self.read_state != ReadState::Closed,
            WriteError::invalid_write_state("connection is closing")
        );
        ensure!(self.read_state != ReadState::Tunnel, WriteError::invalid_write_state("connection is a tunnel"));
        ensure!(self.writing.is_none(), WriteError::invalid_write_state("previous request body is not finished"));
        ensure!(
            self.pending_switch.is_none(),
            WriteError::invalid_write_state("waiting for the response to a protocol switch request")
        );

        let framing = outgoing_request_framing(&head)?;
        if head.version() == Version::HTTP_10 && !head.headers().contains("connection") {
            head.headers_mut().append("Connection", "keep-alive");
        }
        let persistent = keep_alive(head.version(), head.headers());
        let method = head.method().clone();
        let switch = head.is_protocol_switch();

        self.encoder.encode(Message::<Request>::Header((head, framing)), self.wire.output())?;

        let seq = self.pipeline.push();
        debug!(seq, %method, ?framing, persistent, "request head written");
        if switch {
            self.pending_switch = Some(PendingSwitch { seq, connect: method == Method::CONNECT });
        }
        self.decoder.expect(method);
        self.writing = Some(seq);
        if !persistent {
            self.closing = true;
        }
        Ok(seq)
    }

    pub fn write_body(&mut self, seq: u64, data: Bytes) -> Result<(), WriteError> {
        let result = self.body_turn(seq).and_then(|_| {
            self.encoder.encode(Message::<Request>::Payload(PayloadItem::Chunk(data)), self.wire.output())
        });
        if let Err(e) = &result {
            error!(seq, cause = %e, "request body rejected");
        }
        result
    }

    /// Completes the request body, with trailers for a chunked body.
    pub fn finish_body(&mut self, seq: u64, trailers: Option<HeaderList>) -> Result<(), WriteError> {
        let result = self.body_turn(seq).and_then(|_| {
            self.encoder.encode(Message::<Request>::Payload(PayloadItem::Eof(trailers)), self.wire.output())
        });
        match &result {
            Ok(()) => {
                debug!(seq, "request complete");
                self.writing = None;
            }
            Err(e) => error!(seq, cause = %e, "finishing request rejected"),
        }
        result
    }

    fn body_turn(&self, seq: u64) -> Result<(), WriteError> {
        ensure!(self.writing == Some(seq), WriteError::invalid_write_state(format!("request {seq} is not being written")));
        Ok(())
    }

    pub fn write_tunnel(&mut self, data: Bytes) -> Result<(), WriteError> {
        ensure!(self.read_state == ReadState::Tunnel, WriteError::invalid_write_state("connection is not a tunnel"));
        self.wire.output().extend_from_slice(&data);
        Ok(())
    }

    /// Writes no further requests and closes once pending responses are read.
    pub fn close(&mut self) {
        debug!(in_flight = self.pipeline.len(), "close requested");
        self.closing = true;
        if (self.pipeline.is_empty() && self.writing.is_none()) || self.read_state == ReadState::Tunnel {
            self.shutdown();
        }
    }

    /// Drops all buffered state and closes immediately.
    pub fn abort(&mut self) {
        debug!(in_flight = self.pipeline.len(), "connection aborted");
        self.wire.abort();
        self.shutdown();
        self.encoder = RequestEncoder::new();
    }

    fn shutdown(&mut self) {
        if !self.pipeline.is_empty() {
            let dropped: Vec<u64> = self.pipeline.iter().collect();
            warn!(?dropped, "connection closing, requests left without a response");
        }
        self.read_state = ReadState::Closed;
        self.closing = true;
        self.writing = None;
        self.pending_switch = None;
        self.pipeline.clear();
        self.wire.close_after_flush();
    }
}

impl Endpoint for ClientConnection {
    type Head = ResponseHead;

    fn feed(&mut self, bytes: &[u8]) {
        ClientConnection::feed(self, bytes)
    }

    fn feed_eof(&mut self) {
        ClientConnection::feed_eof(self)
    }

    fn poll_event(&mut self) -> Result<Option<Event<ResponseHead>>, ParseError> {
        ClientConnection::poll_event(self)
    }

    fn poll_output(&mut self) -> Option<Bytes> {
        ClientConnection::poll_output(self)
    }

    fn poll_signal(&mut self) -> Option<TransportSignal> {
        ClientConnection::poll_signal(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use indoc::indoc;

    fn crlf(s: &str) -> String {
        s.replace('\n', "\r\n")
    }

    fn drain_output(conn: &mut ClientConnection) -> BytesMut {
        let mut out = BytesMut::new();
        while let Some(bytes) = conn.poll_output() {
            out.extend_from_slice(&bytes);
        }
        out
    }

    fn events(conn: &mut ClientConnection) -> Vec<Event<ResponseHead>> {
        std::iter::from_fn(|| conn.poll_event().unwrap()).collect()
    }

    #[test]
    fn request_and_response() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::POST, "/echo").with_header("Content-Length", "5")).unwrap();
        conn.write_body(seq, Bytes::from_static(b"hello")).unwrap();
        conn.finish_body(seq, None).unwrap();
        assert_eq!(&drain_output(&mut conn)[..], b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");

        conn.feed(crlf(indoc! {r##"
        HTTP/1.1 200 OK
        Transfer-Encoding: chunked

        5
        hello
        0
        Checksum: 1

        "##})
        .as_bytes());

        let events = events(&mut conn);
        assert_eq!(events.len(), 3);
        let Event::Head { head, .. } = &events[0] else { panic!("expect head") };
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(events[1], Event::Data { seq, data: Bytes::from_static(b"hello") });
        let Event::End { trailers: Some(trailers), .. } = &events[2] else { panic!("expect trailers") };
        assert_eq!(trailers.get("checksum"), Some(&b"1"[..]));

        assert_eq!(conn.in_flight(), 0);
        assert!(!conn.is_closed());
    }

    #[test]
    fn pipelined_requests_need_finished_bodies() {
        let mut conn = ClientConnection::new(H1Config::default());
        let first = conn.write_head(RequestHead::new(Method::POST, "/").with_header("Transfer-Encoding", "chunked")).unwrap();
        assert!(matches!(conn.write_head(RequestHead::new(Method::GET, "/")), Err(WriteError::InvalidWriteState { .. })));
        conn.finish_body(first, None).unwrap();

        let second = conn.write_head(RequestHead::new(Method::HEAD, "/")).unwrap();
        conn.finish_body(second, None).unwrap();
        assert_eq!(conn.in_flight(), 2);

        conn.feed(b"HTTP/1.1 204 No Content\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n");
        let seqs: Vec<_> = events(&mut conn).iter().map(|event| event.seq()).collect();
        assert_eq!(seqs, vec![Some(first), Some(first), Some(second), Some(second)]);
    }

    #[test]
    fn informational_and_close_delimited() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::GET, "/")).unwrap();
        conn.finish_body(seq, None).unwrap();

        conn.feed(b"HTTP/1.1 103 Early Hints\r\nLink: </style.css>\r\n\r\nHTTP/1.1 200 OK\r\n\r\nstream");
        conn.feed_eof();

        let events = events(&mut conn);
        assert!(matches!(&events[0], Event::Informational { head, .. } if head.status().as_u16() == 103));
        assert!(matches!(&events[1], Event::Head { .. }));
        assert_eq!(events[2], Event::Data { seq, data: Bytes::from_static(b"stream") });
        assert!(events[3].is_end());
        assert!(conn.is_closed());
        assert_eq!(conn.poll_signal(), None);
        drain_output(&mut conn);
        assert_eq!(conn.poll_signal(), Some(TransportSignal::Close));
    }

    /// Collects formatted log lines written while `f` runs.
    fn captured_logs(f: impl FnOnce()) -> String {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt().with_ansi(false).with_writer(move || writer.clone()).finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn close_response_reports_unanswered_requests() {
        let mut conn = ClientConnection::new(H1Config::default());
        for _ in 0..3 {
            let seq = conn.write_head(RequestHead::new(Method::GET, "/")).unwrap();
            conn.finish_body(seq, None).unwrap();
        }
        drain_output(&mut conn);

        let logs = captured_logs(|| {
            conn.feed(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n");
            let events = events(&mut conn);
            assert_eq!(events.len(), 2);
            assert_eq!(events[1], Event::End { seq: 0, trailers: None });
        });

        assert!(conn.is_closed());
        assert_eq!(conn.in_flight(), 0);
        assert!(logs.contains("dropped=[1, 2]"), "{logs}");
    }

    #[test]
    fn http10_request_asks_for_keep_alive() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::GET, "/").with_version(Version::HTTP_10)).unwrap();
        conn.finish_body(seq, None).unwrap();
        assert_eq!(&drain_output(&mut conn)[..], b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n");
    }

    #[test]
    fn connect_tunnel() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::CONNECT, "example.com:443")).unwrap();
        conn.finish_body(seq, None).unwrap();
        assert!(matches!(conn.write_head(RequestHead::new(Method::GET, "/")), Err(WriteError::InvalidWriteState { .. })));

        conn.feed(b"HTTP/1.1 200 Connection Established\r\n\r\n\x16\x03\x01");
        let events = events(&mut conn);
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], Event::Tunnel(Bytes::from_static(b"\x16\x03\x01")));
        assert!(conn.is_tunnel());
        conn.write_tunnel(Bytes::from_static(b"\x16\x03\x03")).unwrap();

        assert!(!conn.is_eof());
        conn.feed_eof();
        assert_eq!(conn.poll_event().unwrap(), None);
        assert!(conn.is_eof());
    }

    #[test]
    fn unsolicited_switch_is_rejected() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::GET, "/")).unwrap();
        conn.finish_body(seq, None).unwrap();

        conn.feed(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: h2c\r\n\r\n");
        assert!(matches!(conn.poll_event(), Err(ParseError::MalformedHead { .. })));
        assert!(conn.poll_event().unwrap().is_none());
        assert!(conn.is_closed());
    }

    #[test]
    fn eof_before_response() {
        let mut conn = ClientConnection::new(H1Config::default());
        let seq = conn.write_head(RequestHead::new(Method::GET, "/")).unwrap();
        conn.finish_body(seq, None).unwrap();

        conn.feed_eof();
        assert!(matches!(conn.poll_event(), Err(ParseError::UnexpectedEof)));
    }
}
