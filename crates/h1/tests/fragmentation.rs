use bytes::{Bytes, BytesMut};
use indoc::indoc;
use micro_h1::codec::head::RequestHeadDecoder;
use micro_h1::config::H1Config;
use micro_h1::connection::{Event, ServerConnection};
use micro_h1::protocol::RequestHead;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

fn crlf(s: &str) -> Vec<u8> {
    s.replace('\n', "\r\n").into_bytes()
}

fn request() -> Vec<u8> {
    crlf(indoc! {r##"
    POST /upload?name=report.txt HTTP/1.1
    Host: example.com
    User-Agent: curl/7.79.1
    Accept: */*
    Set-Cookie: a=1
    Set-Cookie: b=2
    Transfer-Encoding: chunked

    4
    Wiki
    5;ext=1
    pedia
    0
    Digest: sha-256=abc

    "##})
}

/// Feeds `parts` one by one and collects every event with consecutive data merged.
fn collect(parts: &[&[u8]]) -> (Vec<Event<RequestHead>>, Bytes) {
    collect_with(H1Config::default(), parts)
}

fn collect_with(config: H1Config, parts: &[&[u8]]) -> (Vec<Event<RequestHead>>, Bytes) {
    let mut conn = ServerConnection::new(config);
    let mut events = Vec::new();
    let mut body = BytesMut::new();

    for part in parts {
        conn.feed(part);
        while let Some(event) = conn.poll_event().unwrap() {
            match event {
                Event::Data { data, .. } => body.extend_from_slice(&data),
                event => events.push(event),
            }
        }
    }
    (events, body.freeze())
}

#[test]
fn every_split_point_yields_the_same_exchange() {
    let request = request();
    let (expected, expected_body) = collect(&[&request]);
    assert_eq!(expected.len(), 2);
    assert_eq!(&expected_body[..], b"Wikipedia");

    for split in 1..request.len() {
        let (head, tail) = request.split_at(split);
        let (events, body) = collect(&[head, tail]);
        assert_eq!(events, expected, "split at {split}");
        assert_eq!(body, expected_body, "split at {split}");
    }
}

#[test]
fn byte_by_byte() {
    let request = request();
    let parts: Vec<&[u8]> = request.chunks(1).collect();
    let (events, body) = collect(&parts);
    let (expected, expected_body) = collect(&[&request]);

    assert_eq!(events, expected);
    assert_eq!(body, expected_body);
}

#[test]
fn header_line_at_the_limit_survives_every_split() {
    let config = H1Config::default().with_max_line_size(32);
    let line = format!("X-A: {}", "a".repeat(27));
    assert_eq!(line.len(), 32);
    let request = format!("GET / HTTP/1.1\r\nHost: a\r\n{line}\r\n\r\n").into_bytes();

    let (expected, _) = collect_with(config, &[&request]);
    assert_eq!(expected.len(), 2);

    for split in 1..request.len() {
        let (head, tail) = request.split_at(split);
        let (events, _) = collect_with(config, &[head, tail]);
        assert_eq!(events, expected, "split at {split}");
    }
}

fn head_strategy() -> impl Strategy<Value = String> {
    let method = prop_oneof![Just("GET"), Just("POST"), Just("DELETE"), Just("OPTIONS")];
    let target = "/[a-z0-9/._-]{0,24}";
    let version = prop_oneof![Just("HTTP/1.0"), Just("HTTP/1.1")];
    let field = ("[A-Za-z][A-Za-z0-9-]{0,15}", "[ -~]{0,32}");
    let fields = proptest::collection::vec(field, 0..12);

    (method, target, version, fields).prop_map(|(method, target, version, fields)| {
        let mut head = format!("{method} {target} {version}\r\n");
        for (name, value) in fields {
            head.push_str(&format!("{name}: {}\r\n", value.trim()));
        }
        head.push_str("\r\n");
        head
    })
}

proptest! {
    #[test]
    fn head_parsing_ignores_fragmentation(head in head_strategy(), splits in proptest::collection::vec(any::<prop::sample::Index>(), 0..6)) {
        let limits = H1Config::default().head_limits();
        let bytes = head.as_bytes();

        let mut whole = BytesMut::from(bytes);
        let expected = RequestHeadDecoder::new(limits).decode(&mut whole).unwrap().unwrap();

        let mut points: Vec<usize> = splits.iter().map(|index| index.index(bytes.len())).collect();
        points.sort_unstable();

        let mut decoder = RequestHeadDecoder::new(limits);
        let mut src = BytesMut::new();
        let mut start = 0;
        let mut decoded = None;
        for end in points.into_iter().chain(std::iter::once(bytes.len())) {
            src.extend_from_slice(&bytes[start..end]);
            start = end;
            if let Some(head) = decoder.decode(&mut src).unwrap() {
                decoded = Some(head);
            }
        }

        prop_assert_eq!(decoded, Some(expected));
        prop_assert!(src.is_empty());
    }
}
