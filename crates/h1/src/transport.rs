//! The byte transport the engine is driven by.
//!
//! The engine itself never performs I/O. A [`Transport`] hands it received bytes and carries
//! its serialized output, and the engine talks back through [`TransportSignal`]s.

use bytes::Bytes;
use futures::StreamExt;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::trace;

/// Initial capacity of the read buffer used by [`IoTransport`].
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Instructions from a connection to whatever drives its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    /// Undrained inbound bytes crossed the high watermark; stop calling `receive`.
    PauseReading,
    /// Undrained inbound bytes dropped below the low watermark; reading may continue.
    ResumeReading,
    /// All output has been handed over; shut the transport down.
    Close,
}

/// An ordered, reliable byte stream such as a TCP or TLS session.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Receives the next run of bytes, or `None` once the peer has closed its side.
    async fn receive(&mut self) -> io::Result<Option<Bytes>>;

    /// Sends `data` in full.
    async fn send(&mut self, data: Bytes) -> io::Result<()>;

    /// Shuts the write side down.
    async fn close(&mut self) -> io::Result<()>;
}

/// A [`Transport`] over a pair of tokio I/O halves.
#[derive(Debug)]
pub struct IoTransport<R, W> {
    framed_read: FramedRead<R, BytesCodec>,
    writer: W,
}

impl<R, W> IoTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { framed_read: FramedRead::with_capacity(reader, BytesCodec::new(), READ_BUFFER_SIZE), writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.framed_read.into_inner(), self.writer)
    }
}

impl<R, W> Transport for IoTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> io::Result<Option<Bytes>> {
        match self.framed_read.next().await {
            Some(Ok(bytes)) => {
                trace!(len = bytes.len(), "received bytes");
                Ok(Some(bytes.freeze()))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn send(&mut self, data: Bytes) -> io::Result<()> {
        trace!(len = data.len(), "sending bytes");
        self.writer.write_all(&data).await?;
        self.writer.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
