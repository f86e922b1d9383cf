//! Wire-level value representation exchanged between codecs and transports.
//!
//! A [`Message`] is a header multimap plus a body. Headers use
//! [`http::HeaderMap`], which is case-insensitive and keeps every value of a
//! repeated header in insertion order.

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE};
use http::HeaderMap;

/// Header carrying the request ID of a start call.
pub const HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("nexus-request-id");

/// Header carrying the terminal state of an unsuccessful outcome or completion.
pub const HEADER_OPERATION_STATE: HeaderName = HeaderName::from_static("nexus-operation-state");

/// Header set by layered byte transforms (e.g. base64).
pub const HEADER_CONTENT_TRANSFER_ENCODING: HeaderName =
    HeaderName::from_static("content-transfer-encoding");

/// An encoded value: headers plus body.
///
/// Immutable once produced. The body is handed out by value through
/// [`Message::into_body`] / [`Message::into_parts`], so it is consumed at most once.
#[derive(Debug, Default)]
pub struct Message {
    headers: HeaderMap,
    body: Bytes,
}

impl Message {
    /// Creates a message from headers and a body.
    #[must_use]
    pub fn new(headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// A message with no headers and an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Borrow the body without consuming it. Codecs use this while probing.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consumes the message, returning the body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consumes the message, returning headers and body.
    #[must_use]
    pub fn into_parts(self) -> (HeaderMap, Bytes) {
        (self.headers, self.body)
    }

    /// The `Content-Type` header, if present and valid UTF-8.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// True when the message has no content type and no body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.headers.contains_key(CONTENT_TYPE) && self.body.is_empty()
    }
}

/// Returns the media type of a content-type value without parameters, lowercased.
#[must_use]
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
