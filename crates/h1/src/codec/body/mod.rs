//! Body codecs: content-length, chunked, close-delimited and empty bodies.
//!
//! [`PayloadDecoder`] and [`PayloadEncoder`] pick the strategy from a [`BodyFraming`] once
//! per message.
//!
//! [`BodyFraming`]: crate::protocol::BodyFraming

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
