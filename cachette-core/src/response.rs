//! Responses returned by strategies and stored in caches.
//!
//! A [`Response`] keeps its body as [`Bytes`]. Reading the body never
//! consumes it, and [`Response::duplicate`] hands out an independent copy,
//! so the same network response can be returned to the caller and written to
//! the store without one consumer exhausting the other.
//!
//! Responses that were served from a cache carry the [`CACHE_HIT_HEADER`]
//! header set to `true`:
//!
//! ```
//! use cachette_core::Response;
//!
//! let response = Response::new("hello");
//! assert!(!response.is_cache_hit());
//!
//! let cached = response.duplicate().mark_cache_hit();
//! assert!(cached.is_cache_hit());
//! assert_eq!(cached.text(), "hello");
//! ```

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// Header marking a response as served from the cache.
///
/// The value is `x-cache-hit`; it is set to `true` on cache hits and absent
/// otherwise.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-cache-hit");

/// An HTTP response with a buffered body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates a `200 OK` response with the given body.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    /// Creates a response with an explicit status.
    pub fn with_status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, keeping existing values for the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Returns an independent copy of this response.
    ///
    /// The body buffer is shared by reference count; neither copy can
    /// observe reads or header changes made through the other.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Returns `true` if the response was served from a cache.
    pub fn is_cache_hit(&self) -> bool {
        self.headers
            .get(CACHE_HIT_HEADER)
            .is_some_and(|value| value.as_bytes() == b"true")
    }

    /// Marks the response as served from a cache.
    pub fn mark_cache_hit(mut self) -> Self {
        self.headers
            .insert(CACHE_HIT_HEADER, HeaderValue::from_static("true"));
        self
    }

    /// Removes the cache-hit marker, if present.
    pub fn clear_cache_hit(mut self) -> Self {
        self.headers.remove(CACHE_HIT_HEADER);
        self
    }

    /// Converts into an [`http::Response`].
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl From<http::Response<Bytes>> for Response {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Response {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_is_independent() {
        let original = Response::new("body");
        let mut copy = original.duplicate();
        copy.headers_mut()
            .insert(HeaderName::from_static("x-extra"), HeaderValue::from_static("1"));

        assert!(original.headers().get("x-extra").is_none());
        assert_eq!(original.body(), copy.body());
    }

    #[test]
    fn cache_hit_marker_requires_true() {
        let response = Response::new("body")
            .with_header(CACHE_HIT_HEADER, HeaderValue::from_static("false"));
        assert!(!response.is_cache_hit());
        assert!(!response.mark_cache_hit().clear_cache_hit().is_cache_hit());
    }
}
