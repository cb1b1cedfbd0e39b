//! Start-line and header block codecs.
//!
//! Decoding runs in two passes over the buffered bytes: [`scan`] validates the complete lines
//! of the block and finds where it ends, then `httparse` tokenizes exactly that block. Field
//! names and values are never copied: the block is frozen into `Bytes` and every field is a
//! slice of it.

mod head_encoder;
mod request_head_decoder;
mod response_head_decoder;
pub(crate) mod scan;

pub use head_encoder::HeadEncoder;
pub use request_head_decoder::RequestHeadDecoder;
pub use response_head_decoder::ResponseHeadDecoder;

use std::ops::Range;

use bytes::{Buf, Bytes, BytesMut};
use http::Version;
use httparse::Status;

use crate::config::HeadLimits;
use crate::protocol::{HeaderList, ParseError};
use scan::{BlockKind, scan_block};

/// Byte ranges of one field inside the head block.
///
/// Recorded while `httparse` still borrows the buffer, resolved against the frozen block
/// afterwards.
#[derive(Debug, Clone)]
struct FieldIndex {
    name: Range<usize>,
    value: Range<usize>,
}

impl FieldIndex {
    fn record(block: &[u8], fields: &[httparse::Header<'_>]) -> Vec<FieldIndex> {
        let base = block.as_ptr() as usize;
        fields
            .iter()
            .map(|field| {
                let name_start = field.name.as_ptr() as usize - base;
                let value = field.value.trim_ascii();
                let value_start = value.as_ptr() as usize - base;
                FieldIndex {
                    name: name_start..name_start + field.name.len(),
                    value: value_start..value_start + value.len(),
                }
            })
            .collect()
    }

    fn resolve(block: &Bytes, indices: &[FieldIndex]) -> HeaderList {
        let mut headers = HeaderList::with_capacity(indices.len());
        for index in indices {
            headers.append(block.slice(index.name.clone()), block.slice(index.value.clone()));
        }
        headers
    }
}

/// Drops empty lines a peer may send ahead of a start line.
fn skip_empty_lines(src: &mut BytesMut) {
    while src.starts_with(b"\r\n") {
        src.advance(2);
    }
}

fn http_version(version: Option<u8>) -> Result<Version, ParseError> {
    match version {
        Some(0) => Ok(Version::HTTP_10),
        Some(1) => Ok(Version::HTTP_11),
        v => Err(ParseError::malformed_head(format!("unsupported http version: {v:?}"))),
    }
}

fn map_httparse_error(e: httparse::Error) -> ParseError {
    match e {
        httparse::Error::HeaderValue => ParseError::malformed_header(e),
        httparse::Error::TooManyHeaders => ParseError::head_too_large(e),
        e => ParseError::malformed_head(e),
    }
}

/// Decodes a trailer block following the last chunk.
///
/// Returns `Ok(None)` until the terminating empty line has arrived. An empty block yields
/// `Some(None)`.
pub(crate) fn decode_trailers(src: &mut BytesMut, limits: &HeadLimits) -> Result<Option<Option<HeaderList>>, ParseError> {
    let Some(bounds) = scan_block(src, limits, BlockKind::Trailer)? else {
        return Ok(None);
    };

    if bounds.fields == 0 {
        src.advance(bounds.len);
        return Ok(Some(None));
    }

    let mut fields = vec![httparse::EMPTY_HEADER; bounds.fields];
    let indices = match httparse::parse_headers(&src[..bounds.len], &mut fields).map_err(map_httparse_error)? {
        Status::Complete((_, parsed)) => FieldIndex::record(&src[..bounds.len], parsed),
        Status::Partial => return Err(ParseError::malformed_header("incomplete trailer block")),
    };

    let block = src.split_to(bounds.len).freeze();
    Ok(Some(Some(FieldIndex::resolve(&block, &indices))))
}
