//! Decoder for request lines and their header block.

use bytes::BytesMut;
use http::Method;
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::scan::{BlockKind, scan_block};
use super::{FieldIndex, http_version, map_httparse_error, skip_empty_lines};
use crate::config::HeadLimits;
use crate::protocol::{ParseError, RequestHead};

/// Turns buffered bytes into a [`RequestHead`], or asks for more.
///
/// The decoder is stateless between calls: a partial head stays in the buffer and is
/// rescanned when more bytes arrive, so splitting the input at any byte boundary yields the
/// same head as feeding it at once.
#[derive(Debug, Clone)]
pub struct RequestHeadDecoder {
    limits: HeadLimits,
}

impl RequestHeadDecoder {
    pub fn new(limits: HeadLimits) -> Self {
        Self { limits }
    }
}

impl Decoder for RequestHeadDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        skip_empty_lines(src);

        let Some(bounds) = scan_block(src, &self.limits, BlockKind::Head)? else {
            return Ok(None);
        };

        let mut fields = vec![httparse::EMPTY_HEADER; bounds.fields];
        let mut req = httparse::Request::new(&mut fields);

        if req.parse(&src[..bounds.len]).map_err(map_httparse_error)? == Status::Partial {
            return Err(ParseError::malformed_head("incomplete request head"));
        }

        let method = req.method.ok_or_else(|| ParseError::malformed_head("missing method"))?;
        let method = Method::from_bytes(method.as_bytes()).map_err(ParseError::malformed_head)?;
        let target = req.path.ok_or_else(|| ParseError::malformed_head("missing request target"))?.to_owned();
        let version = http_version(req.version)?;
        let indices = FieldIndex::record(&src[..bounds.len], req.headers);

        let block = src.split_to(bounds.len).freeze();
        let headers = FieldIndex::resolve(&block, &indices);

        trace!(head_size = bounds.len, fields = headers.len(), %method, "parsed request head");
        Ok(Some(RequestHead::from_parts(method, target, version, headers)))
    }
}
