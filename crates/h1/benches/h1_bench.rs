use std::hint::black_box;

use bytes::{Bytes, BytesMut};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use http::StatusCode;
use micro_h1::codec::{RequestDecoder, ResponseEncoder};
use micro_h1::config::H1Config;
use micro_h1::connection::{Event, ServerConnection};
use micro_h1::protocol::{BodyFraming, Message, PayloadItem, ResponseHead};
use tokio_util::codec::{Decoder, Encoder};

const SIMPLE_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

const BROWSER_REQUEST: &[u8] = b"GET /index.html?page=1 HTTP/1.1\r\n\
Host: www.example.com\r\n\
User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
Accept-Language: en-US,en;q=0.5\r\n\
Accept-Encoding: gzip, deflate, br\r\n\
Connection: keep-alive\r\n\
Cookie: session=0123456789abcdef; theme=dark\r\n\
Upgrade-Insecure-Requests: 1\r\n\
Cache-Control: max-age=0\r\n\r\n";

const CHUNKED_REQUEST: &[u8] = b"POST /upload HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n\
400\r\n0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\
0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef\r\n0\r\n\r\n";

fn bench_request_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decoder");

    for (name, request) in [("simple", SIMPLE_REQUEST), ("browser", BROWSER_REQUEST), ("chunked", CHUNKED_REQUEST)] {
        group.throughput(Throughput::Bytes(request.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut decoder = RequestDecoder::new(H1Config::default());
                let mut bytes = BytesMut::from(request);
                while let Some(message) = decoder.decode(&mut bytes).unwrap() {
                    black_box(message);
                }
            });
        });
    }

    group.finish();
}

fn bench_response_encoder(c: &mut Criterion) {
    let body = Bytes::from_static(b"Hello World!");

    c.bench_function("encode_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut dst = BytesMut::with_capacity(256);
            let head = ResponseHead::new(StatusCode::OK).with_header("Content-Type", "text/plain");
            encoder.encode(Message::<_, Bytes>::Header((head, BodyFraming::Length(body.len() as u64))), &mut dst).unwrap();
            encoder.encode(Message::<(ResponseHead, BodyFraming)>::from(body.clone()), &mut dst).unwrap();
            encoder.encode(Message::<(ResponseHead, BodyFraming)>::Payload(PayloadItem::Eof(None)), &mut dst).unwrap();
            black_box(dst);
        });
    });
}

fn bench_server_exchange(c: &mut Criterion) {
    let pipelined: Vec<u8> = BROWSER_REQUEST.repeat(16);

    c.bench_function("server_pipelined_exchanges", |b| {
        b.iter(|| {
            let mut conn = ServerConnection::new(H1Config::default());
            conn.feed(&pipelined);
            while let Some(event) = conn.poll_event().unwrap() {
                if let Event::End { seq, .. } = event {
                    conn.write_head(seq, ResponseHead::new(StatusCode::NO_CONTENT)).unwrap();
                    conn.finish_body(seq, None).unwrap();
                }
            }
            while let Some(bytes) = conn.poll_output() {
                black_box(bytes);
            }
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_server_exchange);
criterion_main!(benches);
