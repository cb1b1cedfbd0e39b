//! Request heads.
//!
//! A [`RequestHead`] is the request line plus its header block. Heads produced by the parser
//! keep the request target exactly as it was received; converting to an `http::Request`
//! parses it into a `Uri`.

use bytes::Bytes;
use http::{Method, Request, Version};

use crate::protocol::HeaderList;

/// The request line and headers of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    target: String,
    version: Version,
    headers: HeaderList,
}

impl RequestHead {
    /// An HTTP/1.1 request without headers.
    pub fn new<S: Into<String>>(method: Method, target: S) -> Self {
        Self { method, target: target.into(), version: Version::HTTP_11, headers: HeaderList::new() }
    }

    pub(crate) fn from_parts(method: Method, target: String, version: Version, headers: HeaderList) -> Self {
        Self { method, target, version, headers }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_header<N: Into<Bytes>, V: Into<Bytes>>(mut self, name: N, value: V) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    /// `Upgrade` offered together with a `Connection: upgrade` token.
    pub fn is_upgrade(&self) -> bool {
        self.headers.contains("upgrade") && self.headers.has_token("connection", "upgrade")
    }

    /// Whether answering this request may switch the connection away from HTTP.
    pub fn is_protocol_switch(&self) -> bool {
        self.method == Method::CONNECT || self.is_upgrade()
    }

    pub fn expects_continue(&self) -> bool {
        self.headers.get("expect").is_some_and(|value| value.trim_ascii().eq_ignore_ascii_case(b"100-continue"))
    }
}

impl TryFrom<&RequestHead> for Request<()> {
    type Error = http::Error;

    fn try_from(head: &RequestHead) -> Result<Self, Self::Error> {
        let mut request = Request::builder().method(head.method.clone()).uri(head.target.as_str()).version(head.version).body(())?;
        *request.headers_mut() = http::HeaderMap::try_from(&head.headers)?;
        Ok(request)
    }
}

impl<T> From<&Request<T>> for RequestHead {
    fn from(request: &Request<T>) -> Self {
        let target = request.uri().path_and_query().map_or_else(|| request.uri().to_string(), ToString::to_string);
        Self {
            method: request.method().clone(),
            target,
            version: request.version(),
            headers: HeaderList::from(request.headers()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_detection() {
        let head = RequestHead::new(Method::GET, "/chat").with_header("Upgrade", "websocket").with_header("Connection", "Upgrade");
        assert!(head.is_upgrade());
        assert!(head.is_protocol_switch());

        let head = RequestHead::new(Method::GET, "/chat").with_header("Upgrade", "websocket");
        assert!(!head.is_upgrade());

        let head = RequestHead::new(Method::CONNECT, "example.com:443");
        assert!(head.is_protocol_switch());
    }

    #[test]
    fn expect_continue() {
        let head = RequestHead::new(Method::POST, "/upload").with_header("Expect", "100-Continue");
        assert!(head.expects_continue());
        assert!(!RequestHead::new(Method::POST, "/upload").expects_continue());
    }

    #[test]
    fn http_request_conversion() {
        let head = RequestHead::new(Method::GET, "/index/?a=1").with_header("Host", "127.0.0.1:8080");
        let request = Request::<()>::try_from(&head).unwrap();
        assert_eq!(request.uri().path(), "/index/");
        assert_eq!(request.uri().query(), Some("a=1"));
        assert_eq!(request.headers().get("host").unwrap(), "127.0.0.1:8080");

        let back = RequestHead::from(&request);
        assert_eq!(back.method(), &Method::GET);
        assert_eq!(back.target(), "/index/?a=1");
        assert_eq!(back.headers().get("Host"), Some(&b"127.0.0.1:8080"[..]));
    }
}
