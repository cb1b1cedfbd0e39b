//! Codecs turning bytes into HTTP messages and back.
//!
//! All of them implement the `tokio_util` [`Decoder`]/[`Encoder`] traits over a `BytesMut`
//! and never touch I/O, so they can run inside a [`Framed`] as well as under the sans-io
//! connections in [`crate::connection`].
//!
//! - [`head`]: start lines and header blocks
//! - [`body`]: content-length, chunked, close-delimited and empty bodies
//! - [`framing`]: which body framing a head implies, and whether the connection persists
//! - [`RequestDecoder`], [`ResponseDecoder`], [`MessageEncoder`]: head and body combined
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder
//! [`Framed`]: tokio_util::codec::Framed

pub mod body;
pub mod framing;
pub mod head;
mod message_encoder;
mod request_decoder;
mod response_decoder;

pub use message_encoder::{MessageEncoder, RequestEncoder, ResponseEncoder};
pub use request_decoder::RequestDecoder;
pub use response_decoder::ResponseDecoder;
