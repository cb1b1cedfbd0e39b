//! Decoder for status lines and their header block.

use bytes::BytesMut;
use http::StatusCode;
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use super::scan::{BlockKind, scan_block};
use super::{FieldIndex, http_version, map_httparse_error, skip_empty_lines};
use crate::config::HeadLimits;
use crate::protocol::{ParseError, ResponseHead};

/// Turns buffered bytes into a [`ResponseHead`], or asks for more.
#[derive(Debug, Clone)]
pub struct ResponseHeadDecoder {
    limits: HeadLimits,
}

impl ResponseHeadDecoder {
    pub fn new(limits: HeadLimits) -> Self {
        Self { limits }
    }
}

impl Decoder for ResponseHeadDecoder {
    type Item = ResponseHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        skip_empty_lines(src);

        let Some(bounds) = scan_block(src, &self.limits, BlockKind::Head)? else {
            return Ok(None);
        };

        let mut fields = vec![httparse::EMPTY_HEADER; bounds.fields];
        let mut res = httparse::Response::new(&mut fields);

        if res.parse(&src[..bounds.len]).map_err(map_httparse_error)? == Status::Partial {
            return Err(ParseError::malformed_head("incomplete response head"));
        }

        let version = http_version(res.version)?;
        let code = res.code.ok_or_else(|| ParseError::malformed_head("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(ParseError::malformed_head)?;
        let reason = res.reason.filter(|reason| !reason.is_empty()).map(ToOwned::to_owned);
        let indices = FieldIndex::record(&src[..bounds.len], res.headers);

        let block = src.split_to(bounds.len).freeze();
        let headers = FieldIndex::resolve(&block, &indices);

        trace!(head_size = bounds.len, fields = headers.len(), status = code, "parsed response head");
        Ok(Some(ResponseHead::from_parts(version, status, reason, headers)))
    }
}
