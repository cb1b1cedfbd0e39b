//! Ordered header storage.
//!
//! HTTP allows a field name to repeat and the order of repeated fields matters (think of
//! several `Set-Cookie` lines). [`HeaderList`] therefore keeps every field as it arrived, in
//! order and with the original name case, and only compares names case-insensitively on
//! lookup.

use crate::protocol::WriteError;
use crate::utils::split_tokens;
use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};

/// A single `name: value` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: Bytes,
    value: Bytes,
}

impl HeaderField {
    pub fn new<N: Into<Bytes>, V: Into<Bytes>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The value as text, if it is valid UTF-8.
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }
}

/// Header fields in wire order, duplicates preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    fields: Vec<HeaderField>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields.iter().find(|field| field.is(name)).map(HeaderField::value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|field| field.is(name)).and_then(HeaderField::value_str)
    }

    /// Every value for `name`, in wire order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.fields.iter().filter(move |field| field.is(name)).map(HeaderField::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.is(name))
    }

    /// Comma separated tokens across every field named `name`.
    pub fn tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.get_all(name).flat_map(split_tokens)
    }

    /// Whether any field named `name` lists `token`, compared case-insensitively.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.tokens(name).any(|t| t.eq_ignore_ascii_case(token.as_bytes()))
    }

    /// Adds a field after all existing ones.
    pub fn append<N: Into<Bytes>, V: Into<Bytes>>(&mut self, name: N, value: V) {
        self.fields.push(HeaderField::new(name, value));
    }

    /// Replaces every field named `name` with a single one.
    ///
    /// The new field takes the position of the first replaced field, or goes last if there
    /// was none.
    pub fn insert<N: Into<Bytes>, V: Into<Bytes>>(&mut self, name: N, value: V) {
        let field = HeaderField::new(name, value);
        let position = self.fields.iter().position(|f| f.name.eq_ignore_ascii_case(&field.name));
        match position {
            Some(index) => {
                let name = field.name.clone();
                self.fields[index] = field;
                let mut seen = 0usize;
                self.fields.retain(|f| {
                    if f.name.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.fields.push(field),
        }
    }

    /// Removes every field named `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|field| !field.is(name));
        before - self.fields.len()
    }

    /// Checks every name and value against the field grammar.
    pub fn validate(&self) -> Result<(), WriteError> {
        for field in &self.fields {
            HeaderName::from_bytes(&field.name)
                .map_err(|e| WriteError::invalid_head(format!("header name {:?}: {e}", String::from_utf8_lossy(&field.name))))?;
            HeaderValue::from_bytes(&field.value).map_err(|e| WriteError::invalid_head(format!("header value: {e}")))?;
        }
        Ok(())
    }

    /// Writes the fields as `name: value\r\n` lines, without the terminating empty line.
    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        for field in &self.fields {
            dst.reserve(field.name.len() + field.value.len() + 4);
            dst.put_slice(&field.name);
            dst.put_slice(b": ");
            dst.put_slice(&field.value);
            dst.put_slice(b"\r\n");
        }
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<N: Into<Bytes>, V: Into<Bytes>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self { fields: iter.into_iter().map(|(name, value)| HeaderField::new(name, value)).collect() }
    }
}

impl From<&HeaderMap> for HeaderList {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| (Bytes::copy_from_slice(name.as_str().as_bytes()), Bytes::copy_from_slice(value.as_bytes())))
            .collect()
    }
}

impl TryFrom<&HeaderList> for HeaderMap {
    type Error = http::Error;

    fn try_from(list: &HeaderList) -> Result<Self, Self::Error> {
        let mut map = HeaderMap::with_capacity(list.len());
        for field in list {
            let name = HeaderName::from_bytes(field.name())?;
            let value = HeaderValue::from_maybe_shared(field.value.clone())?;
            map.append(name, value);
        }
        Ok(map)
    }
}
