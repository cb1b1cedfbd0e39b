use crate::protocol::{HeaderList, ResponseHead};
use bytes::Bytes;

/// Something a connection parsed out of the inbound bytes.
///
/// Events of one exchange always arrive as `Head`, any number of `Data`, then `End`. `seq`
/// identifies the exchange on its connection and is what the write methods take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<H> {
    Head { seq: u64, head: H },
    /// A `1xx` response that precedes the final one. Clients only.
    Informational { seq: u64, head: ResponseHead },
    Data { seq: u64, data: Bytes },
    End { seq: u64, trailers: Option<HeaderList> },
    /// Raw bytes after a protocol switch.
    Tunnel(Bytes),
}

impl<H> Event<H> {
    /// The exchange this event belongs to, `None` for tunnel bytes.
    pub fn seq(&self) -> Option<u64> {
        match self {
            Event::Head { seq, .. } | Event::Informational { seq, .. } | Event::Data { seq, .. } | Event::End { seq, .. } => {
                Some(*seq)
            }
            Event::Tunnel(_) => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Event::End { .. })
    }
}
