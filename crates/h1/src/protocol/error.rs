use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("write error: {source}")]
    Write {
        #[from]
        source: WriteError,
    },

    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: io::Error,
    },
}

/// Errors caused by the bytes a peer sent. Every one of them is fatal to the connection.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("message head too large: {reason}")]
    HeadTooLarge { reason: String },

    #[error("malformed message head: {reason}")]
    MalformedHead { reason: String },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: String },

    #[error("ambiguous message framing: {reason}")]
    FramingConflict { reason: String },

    #[error("body size {size} exceed the limit {max_size}")]
    BodyTooLarge { size: u64, max_size: u64 },

    #[error("connection closed before the message was complete")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn head_too_large<S: ToString>(str: S) -> Self {
        Self::HeadTooLarge { reason: str.to_string() }
    }

    pub fn malformed_head<S: ToString>(str: S) -> Self {
        Self::MalformedHead { reason: str.to_string() }
    }

    pub fn malformed_header<S: ToString>(str: S) -> Self {
        Self::MalformedHeader { reason: str.to_string() }
    }

    pub fn malformed_chunk<S: ToString>(str: S) -> Self {
        Self::MalformedChunk { reason: str.to_string() }
    }

    pub fn framing_conflict<S: ToString>(str: S) -> Self {
        Self::FramingConflict { reason: str.to_string() }
    }

    pub fn body_too_large(size: u64, max_size: u64) -> Self {
        Self::BodyTooLarge { size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The status a server answers with before closing the connection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HeadTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Errors caused by the local application driving the write side.
///
/// These never close the connection on their own: the offending call is rejected and the
/// connection stays as it was.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("invalid write state: {reason}")]
    InvalidWriteState { reason: String },

    #[error("out of order write: exchange {seq} written while exchange {expected} is still pending")]
    OutOfOrderWrite { seq: u64, expected: u64 },

    #[error("ambiguous message framing: {reason}")]
    FramingConflict { reason: String },

    #[error("invalid message head: {reason}")]
    InvalidHead { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl WriteError {
    pub fn invalid_write_state<S: ToString>(str: S) -> Self {
        Self::InvalidWriteState { reason: str.to_string() }
    }

    pub fn out_of_order(seq: u64, expected: u64) -> Self {
        Self::OutOfOrderWrite { seq, expected }
    }

    pub fn framing_conflict<S: ToString>(str: S) -> Self {
        Self::FramingConflict { reason: str.to_string() }
    }

    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
