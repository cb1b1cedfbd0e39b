//! A sans-io HTTP/1.1 protocol engine.
//!
//! The engine sits between a byte transport and an application. It parses received bytes
//! into request or response events and serializes heads and bodies into wire bytes, but it
//! never reads from or writes to a socket itself.
//!
//! # Features
//!
//! - Incremental head parsing with size, line and field count limits
//! - Content-length, chunked (with trailers) and close-delimited bodies
//! - Strict framing checks against request smuggling
//! - Pipelining with responses enforced in request order
//! - Keep-alive decisions, `100 Continue`, `Upgrade` and `CONNECT` tunnels
//! - High/low watermark backpressure towards the transport
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::StatusCode;
//! use micro_h1::config::H1Config;
//! use micro_h1::connection::{Event, ServerConnection};
//! use micro_h1::protocol::ResponseHead;
//!
//! let mut conn = ServerConnection::new(H1Config::default());
//! conn.feed(b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n");
//!
//! while let Some(event) = conn.poll_event().unwrap() {
//!     if let Event::End { seq, .. } = event {
//!         let head = ResponseHead::new(StatusCode::OK).with_header("Content-Length", "5");
//!         conn.write_head(seq, head).unwrap();
//!         conn.write_body(seq, Bytes::from_static(b"hello")).unwrap();
//!         conn.finish_body(seq, None).unwrap();
//!     }
//! }
//!
//! let output = conn.poll_output().unwrap();
//! assert!(output.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: the inbound byte buffer and watermark
//! - [`protocol`]: heads, header lists, body items and errors
//! - [`codec`]: head and body codecs, framing rules
//! - [`connection`]: server and client state machines, pipelining and the async driver
//! - [`transport`]: the transport interface the driver consumes

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
