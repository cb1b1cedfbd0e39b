//! Response heads.

use bytes::Bytes;
use http::{Response, StatusCode, Version};

use crate::protocol::HeaderList;

/// The status line and headers of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: Version,
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderList,
}

impl ResponseHead {
    /// An HTTP/1.1 response without headers, using the canonical reason phrase.
    pub fn new(status: StatusCode) -> Self {
        Self { version: Version::HTTP_11, status, reason: None, headers: HeaderList::new() }
    }

    pub(crate) fn from_parts(version: Version, status: StatusCode, reason: Option<String>, headers: HeaderList) -> Self {
        Self { version, status, reason, headers }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_header<N: Into<Bytes>, V: Into<Bytes>>(mut self, name: N, value: V) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase as received or set, falling back to the canonical one.
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    /// A 1xx response that precedes the final one. `101 Switching Protocols` is final.
    pub fn is_interim(&self) -> bool {
        self.status.is_informational() && self.status != StatusCode::SWITCHING_PROTOCOLS
    }
}

impl TryFrom<&ResponseHead> for Response<()> {
    type Error = http::Error;

    fn try_from(head: &ResponseHead) -> Result<Self, Self::Error> {
        let mut response = Response::builder().status(head.status).version(head.version).body(())?;
        *response.headers_mut() = http::HeaderMap::try_from(&head.headers)?;
        Ok(response)
    }
}

impl<T> From<&Response<T>> for ResponseHead {
    fn from(response: &Response<T>) -> Self {
        Self {
            version: response.version(),
            status: response.status(),
            reason: None,
            headers: HeaderList::from(response.headers()),
        }
    }
}
