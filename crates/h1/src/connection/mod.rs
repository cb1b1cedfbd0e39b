//! Connection state machines.
//!
//! [`ServerConnection`] and [`ClientConnection`] own everything one connection needs: the
//! inbound buffer, the codecs, the exchange bookkeeping and the output waiting to be sent.
//! They never perform I/O. [`Driver`] runs either of them over an async
//! [`Transport`](crate::transport::Transport).

mod client;
mod driver;
mod event;
mod pipeline;
mod server;
mod wire;

pub use client::ClientConnection;
pub use driver::{Driver, Endpoint};
pub use event::Event;
pub use pipeline::PipelineQueue;
pub use server::ServerConnection;
