//! Protocol types shared by the codecs and the connections.
//!
//! - [`RequestHead`] / [`ResponseHead`]: message heads with an ordered [`HeaderList`]
//! - [`Message`], [`PayloadItem`], [`BodyFraming`]: what the codecs produce and consume
//! - [`ParseError`], [`WriteError`], [`HttpError`]: the error taxonomy

mod message;
pub use message::BodyFraming;
pub use message::Message;
pub use message::PayloadItem;

mod header;
pub use header::HeaderField;
pub use header::HeaderList;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::WriteError;
