use bytes::Bytes;
use tracing::{debug, trace};

use crate::connection::Event;
use crate::protocol::{HttpError, ParseError};
use crate::transport::{Transport, TransportSignal};

/// The sans-io surface shared by [`ServerConnection`] and [`ClientConnection`].
///
/// [`ServerConnection`]: crate::connection::ServerConnection
/// [`ClientConnection`]: crate::connection::ClientConnection
pub trait Endpoint {
    /// The head type of received messages.
    type Head;

    fn feed(&mut self, bytes: &[u8]);

    fn feed_eof(&mut self);

    fn poll_event(&mut self) -> Result<Option<Event<Self::Head>>, ParseError>;

    fn poll_output(&mut self) -> Option<Bytes>;

    fn poll_signal(&mut self) -> Option<TransportSignal>;
}

/// Drives an [`Endpoint`] over an async [`Transport`].
///
/// The driver only moves bytes and obeys signals: received bytes are fed in, output is sent,
/// reading stops while the endpoint asks to pause, and the transport is closed when the
/// endpoint says so. Writes go through [`endpoint_mut`](Self::endpoint_mut) followed by
/// [`flush`](Self::flush).
#[derive(Debug)]
pub struct Driver<E, T> {
    endpoint: E,
    transport: T,
    paused: bool,
    eof: bool,
    closed: bool,
}

impl<E, T> Driver<E, T>
where
    E: Endpoint,
    T: Transport,
{
    pub fn new(endpoint: E, transport: T) -> Self {
        Self { endpoint, transport, paused: false, eof: false, closed: false }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut E {
        &mut self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_parts(self) -> (E, T) {
        (self.endpoint, self.transport)
    }

    /// Waits for the next event.
    ///
    /// Returns `Ok(None)` once no event can arrive without the application acting first:
    /// the input ended, the transport was closed, or reading is paused and the buffered bytes
    /// hold nothing more to report.
    pub async fn next_event(&mut self) -> Result<Option<Event<E::Head>>, HttpError> {
        loop {
            self.flush().await?;

            match self.endpoint.poll_event() {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => {
                    // the error response, if any, goes out before the error is reported
                    self.flush().await?;
                    return Err(e.into());
                }
            }

            self.flush().await?;
            if self.closed || self.eof || self.paused {
                trace!(closed = self.closed, eof = self.eof, paused = self.paused, "no further events");
                return Ok(None);
            }

            match self.transport.receive().await? {
                Some(bytes) => self.endpoint.feed(&bytes),
                None => {
                    debug!("transport reached end of stream");
                    self.eof = true;
                    self.endpoint.feed_eof();
                }
            }
        }
    }

    /// Sends pending output and applies pending signals.
    pub async fn flush(&mut self) -> Result<(), HttpError> {
        while let Some(bytes) = self.endpoint.poll_output() {
            self.transport.send(bytes).await?;
        }

        while let Some(signal) = self.endpoint.poll_signal() {
            match signal {
                TransportSignal::PauseReading => self.paused = true,
                TransportSignal::ResumeReading => self.paused = false,
                TransportSignal::Close if !self.closed => {
                    debug!("closing transport");
                    self.closed = true;
                    self.transport.close().await?;
                }
                TransportSignal::Close => {}
            }
        }
        Ok(())
    }
}
