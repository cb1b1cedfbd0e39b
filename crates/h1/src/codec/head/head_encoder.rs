//! Serializer for request and response heads.
//!
//! The encoder writes the start line, makes sure the framing headers match the
//! [`BodyFraming`] chosen for the message, and writes the header block. Everything is
//! validated before the first byte is written, so a rejected head leaves the output
//! untouched.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::Version;
use tokio_util::codec::Encoder;
use tracing::error;

use crate::ensure;
use crate::protocol::{BodyFraming, HeaderList, RequestHead, ResponseHead, WriteError};

/// Initial buffer size reserved for a head.
const INIT_HEAD_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadEncoder;

impl Encoder<(RequestHead, BodyFraming)> for HeadEncoder {
    type Error = WriteError;

    fn encode(&mut self, item: (RequestHead, BodyFraming), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, framing) = item;

        let version = version_str(head.version())?;
        ensure!(
            !head.target().is_empty() && head.target().bytes().all(|b| b.is_ascii_graphic()),
            WriteError::invalid_head(format!("invalid request target {:?}", head.target()))
        );
        head.headers().validate()?;

        dst.reserve(INIT_HEAD_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), head.target(), version)?;

        set_framing_headers(head.headers_mut(), framing);
        head.headers().encode(dst);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

impl Encoder<(ResponseHead, BodyFraming)> for HeadEncoder {
    type Error = WriteError;

    fn encode(&mut self, item: (ResponseHead, BodyFraming), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, framing) = item;

        let version = version_str(head.version())?;
        ensure!(
            head.reason().bytes().all(|b| b == b'\t' || b == b' ' || b.is_ascii_graphic() || b >= 0x80),
            WriteError::invalid_head(format!("invalid reason phrase {:?}", head.reason()))
        );
        head.headers().validate()?;

        dst.reserve(INIT_HEAD_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", version, head.status().as_str(), head.reason())?;

        set_framing_headers(head.headers_mut(), framing);
        head.headers().encode(dst);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn version_str(version: Version) -> Result<&'static str, WriteError> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        v => {
            error!(http_version = ?v, "unsupported http version");
            Err(WriteError::invalid_head(format!("unsupported http version {v:?}")))
        }
    }
}

/// Adds the header announcing `framing` when the application left it out.
fn set_framing_headers(headers: &mut HeaderList, framing: BodyFraming) {
    match framing {
        BodyFraming::Length(n) if !headers.contains("content-length") => {
            headers.append("Content-Length", n.to_string());
        }
        BodyFraming::Chunked if !headers.contains("transfer-encoding") => {
            headers.append("Transfer-Encoding", "chunked");
        }
        _ => {}
    }
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
