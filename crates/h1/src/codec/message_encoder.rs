use crate::codec::body::PayloadEncoder;
use crate::codec::head::HeadEncoder;
use crate::protocol::{BodyFraming, Message, RequestHead, ResponseHead, WriteError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes a head followed by its body items.
///
/// A head must come first and every body must be finished with [`PayloadItem::Eof`] before
/// the next head; anything else is an [`WriteError::InvalidWriteState`].
///
/// [`PayloadItem::Eof`]: crate::protocol::PayloadItem::Eof
#[derive(Debug)]
pub struct MessageEncoder<H> {
    head_encoder: HeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
    _head: std::marker::PhantomData<fn(H)>,
}

pub type RequestEncoder = MessageEncoder<RequestHead>;
pub type ResponseEncoder = MessageEncoder<ResponseHead>;

impl<H> MessageEncoder<H> {
    pub fn new() -> Self {
        Self { head_encoder: HeadEncoder, payload_encoder: None, _head: std::marker::PhantomData }
    }

    /// Whether a head was written whose body is not finished yet.
    pub fn in_payload(&self) -> bool {
        self.payload_encoder.is_some()
    }
}

impl<H> Default for MessageEncoder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, D: Buf> Encoder<Message<(H, BodyFraming), D>> for MessageEncoder<H>
where
    HeadEncoder: Encoder<(H, BodyFraming), Error = WriteError>,
{
    type Error = WriteError;

    fn encode(&mut self, item: Message<(H, BodyFraming), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, framing)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive message head");
                    return Err(WriteError::invalid_write_state("head written before the previous body was finished"));
                }

                self.head_encoder.encode((head, framing), dst)?;
                self.payload_encoder = Some(PayloadEncoder::from_framing(framing));
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect message head but receive payload item");
                    return Err(WriteError::invalid_write_state("body written before its head"));
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}
