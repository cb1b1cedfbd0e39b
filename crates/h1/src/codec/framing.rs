//! Message framing and connection persistence rules.
//!
//! Incoming heads are judged strictly: a request whose body boundary could be read two ways
//! is rejected, because a proxy in front of us might read it the other way. Outgoing heads
//! are checked so that the framing headers we send agree with how we encode the body.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>

use http::{Method, StatusCode, Version};

use crate::config::H1Config;
use crate::ensure;
use crate::protocol::{BodyFraming, HeaderList, ParseError, RequestHead, ResponseHead, WriteError};

const CONTENT_LENGTH: &str = "content-length";
const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Whether the connection may carry another exchange after this message.
pub fn keep_alive(version: Version, headers: &HeaderList) -> bool {
    if headers.has_token("connection", "close") {
        return false;
    }
    match version {
        Version::HTTP_11 => true,
        Version::HTTP_10 => headers.has_token("connection", "keep-alive"),
        _ => false,
    }
}

/// Both `Content-Length` and `Transfer-Encoding` are present.
pub fn is_ambiguous(headers: &HeaderList) -> bool {
    headers.contains(CONTENT_LENGTH) && headers.contains(TRANSFER_ENCODING)
}

/// Checks that `chunked` is the final transfer coding and appears only once.
fn is_chunked(headers: &HeaderList) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    let mut chunked = 0usize;
    let mut last_is_chunked = false;
    for token in headers.tokens(TRANSFER_ENCODING) {
        last_is_chunked = token.eq_ignore_ascii_case(CHUNKED);
        if last_is_chunked {
            chunked += 1;
        }
    }
    last_is_chunked && chunked == 1
}

fn parse_length(value: &[u8]) -> Option<u64> {
    if value.is_empty() {
        return None;
    }
    value.iter().try_fold(0u64, |acc, b| {
        if b.is_ascii_digit() { acc.checked_mul(10)?.checked_add(u64::from(b - b'0')) } else { None }
    })
}

/// The single `Content-Length` value, if any.
fn content_length(headers: &HeaderList) -> Result<Option<u64>, ParseError> {
    if !headers.contains(CONTENT_LENGTH) {
        return Ok(None);
    }

    let mut values = headers.tokens(CONTENT_LENGTH);
    let value = values.next().ok_or_else(|| ParseError::malformed_header("empty content-length"))?;
    ensure!(values.next().is_none(), ParseError::framing_conflict("multiple content-length values"));

    parse_length(value)
        .map(Some)
        .ok_or_else(|| ParseError::malformed_header(format!("invalid content-length {:?}", String::from_utf8_lossy(value))))
}

fn checked_length(length: u64, config: &H1Config) -> Result<BodyFraming, ParseError> {
    ensure!(length <= config.max_body_size(), ParseError::body_too_large(length, config.max_body_size()));
    Ok(BodyFraming::Length(length))
}

/// Framing of a request received by a server.
pub fn request_framing(head: &RequestHead, config: &H1Config) -> Result<BodyFraming, ParseError> {
    let headers = head.headers();

    if headers.contains(TRANSFER_ENCODING) {
        ensure!(
            !headers.contains(CONTENT_LENGTH),
            ParseError::framing_conflict("transfer-encoding and content-length both present in headers")
        );
        ensure!(head.version() == Version::HTTP_11, ParseError::framing_conflict("transfer-encoding in a HTTP/1.0 request"));
        ensure!(is_chunked(headers), ParseError::framing_conflict("transfer-encoding does not end with a single chunked"));
        return Ok(BodyFraming::Chunked);
    }

    match content_length(headers)? {
        Some(length) => checked_length(length, config),
        None => Ok(BodyFraming::Empty),
    }
}

/// Responses that never carry a body, whatever their headers say.
fn body_forbidden(status: StatusCode, method: &Method) -> bool {
    *method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || (*method == Method::CONNECT && status.is_success())
}

/// Framing of a response received by a client for a request made with `method`.
pub fn response_framing(head: &ResponseHead, method: &Method, config: &H1Config) -> Result<BodyFraming, ParseError> {
    if body_forbidden(head.status(), method) {
        return Ok(BodyFraming::Empty);
    }

    let headers = head.headers();
    if headers.contains(TRANSFER_ENCODING) {
        return Ok(if is_chunked(headers) { BodyFraming::Chunked } else { BodyFraming::UntilClose });
    }

    match content_length(headers)? {
        Some(length) => checked_length(length, config),
        None => Ok(BodyFraming::UntilClose),
    }
}

fn outgoing_length(headers: &HeaderList) -> Result<Option<u64>, WriteError> {
    content_length(headers).map_err(|e| match e {
        ParseError::FramingConflict { reason } => WriteError::FramingConflict { reason },
        e => WriteError::invalid_head(e),
    })
}

/// Framing for a request about to be written.
///
/// Without `Content-Length` or `Transfer-Encoding` the request carries no body.
pub fn outgoing_request_framing(head: &RequestHead) -> Result<BodyFraming, WriteError> {
    let headers = head.headers();

    if headers.contains(TRANSFER_ENCODING) {
        ensure!(
            !headers.contains(CONTENT_LENGTH),
            WriteError::framing_conflict("transfer-encoding and content-length both present in headers")
        );
        ensure!(head.version() == Version::HTTP_11, WriteError::framing_conflict("transfer-encoding in a HTTP/1.0 request"));
        ensure!(is_chunked(headers), WriteError::framing_conflict("transfer-encoding must end with chunked"));
        return Ok(BodyFraming::Chunked);
    }

    Ok(outgoing_length(headers)?.map_or(BodyFraming::Empty, BodyFraming::Length))
}

/// Framing for a response about to be written to a peer that spoke `peer_version`.
///
/// Without `Content-Length` or `Transfer-Encoding` the body is chunked for HTTP/1.1 peers and
/// delimited by closing the connection for HTTP/1.0 peers.
pub fn outgoing_response_framing(head: &ResponseHead, method: &Method, peer_version: Version) -> Result<BodyFraming, WriteError> {
    let headers = head.headers();
    let status = head.status();

    if body_forbidden(status, method) {
        if status.is_informational() || status == StatusCode::NO_CONTENT {
            ensure!(
                !headers.contains(TRANSFER_ENCODING) && !headers.contains(CONTENT_LENGTH),
                WriteError::framing_conflict(format!("framing headers on a {status} response"))
            );
        }
        return Ok(BodyFraming::Empty);
    }

    if headers.contains(TRANSFER_ENCODING) {
        ensure!(
            !headers.contains(CONTENT_LENGTH),
            WriteError::framing_conflict("transfer-encoding and content-length both present in headers")
        );
        ensure!(is_chunked(headers), WriteError::framing_conflict("transfer-encoding must end with chunked"));
        ensure!(peer_version == Version::HTTP_11, WriteError::framing_conflict("chunked body for a HTTP/1.0 peer"));
        return Ok(BodyFraming::Chunked);
    }

    match outgoing_length(headers)? {
        Some(length) => Ok(BodyFraming::Length(length)),
        None if peer_version == Version::HTTP_11 => Ok(BodyFraming::Chunked),
        None => Ok(BodyFraming::UntilClose),
    }
}
