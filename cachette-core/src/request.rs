//! Requests handed to strategies and network adapters.
//!
//! A [`Request`] is a plain value: method, URI, headers and a fully buffered
//! body. Strategies accept anything implementing [`IntoRequest`], so callers
//! can pass a URL string directly:
//!
//! ```
//! use cachette_core::{IntoRequest, Request};
//!
//! let request = "/api/cache-first".into_request().unwrap();
//! assert_eq!(request.method(), http::Method::GET);
//! assert_eq!(request.uri().path(), "/api/cache-first");
//!
//! // Fragments never take part in request identity.
//! let same = Request::get("/api/cache-first#section").unwrap();
//! assert_eq!(request.key(), same.key());
//! ```

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use thiserror::Error;

use crate::key::RequestKey;

/// Error returned when a value cannot be turned into a [`Request`].
#[derive(Debug, Error)]
pub enum InvalidRequest {
    /// The URL could not be parsed.
    #[error("invalid request url `{url}`: {source}")]
    Url {
        /// The rejected input.
        url: String,
        /// Parser error.
        #[source]
        source: http::uri::InvalidUri,
    },
}

/// An HTTP request with a buffered body.
///
/// Cloning is cheap: the body is reference counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a `GET` request for the given URL.
    ///
    /// Both absolute (`https://example.com/a`) and origin-relative (`/a`)
    /// URLs are accepted. Any `#fragment` is dropped.
    pub fn get(url: &str) -> Result<Self, InvalidRequest> {
        let trimmed = url.split_once('#').map_or(url, |(head, _)| head);
        let uri = trimmed
            .parse::<Uri>()
            .map_err(|source| InvalidRequest::Url {
                url: url.to_owned(),
                source,
            })?;
        Ok(Request::new(Method::GET, uri))
    }

    /// Adds a header, keeping existing values for the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the normalized identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.uri)
    }

    /// Converts into an [`http::Request`].
    pub fn into_http(self) -> http::Request<Bytes> {
        let mut request = http::Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Request {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }
}

/// Conversion into a [`Request`], used by strategy entry points.
pub trait IntoRequest {
    /// Performs the conversion.
    fn into_request(self) -> Result<Request, InvalidRequest>;
}

impl IntoRequest for Request {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Ok(self)
    }
}

impl IntoRequest for &Request {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Ok(self.clone())
    }
}

impl IntoRequest for &str {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Request::get(self)
    }
}

impl IntoRequest for String {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Request::get(&self)
    }
}

impl IntoRequest for &String {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Request::get(self)
    }
}

impl IntoRequest for Uri {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Ok(Request::new(Method::GET, self))
    }
}

impl IntoRequest for http::Request<Bytes> {
    fn into_request(self) -> Result<Request, InvalidRequest> {
        Ok(Request::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_url() {
        let err = Request::get("http://exa mple.com/").unwrap_err();
        assert!(err.to_string().contains("exa mple"));
    }

    #[test]
    fn http_round_trip_keeps_headers_and_body() {
        let request = Request::get("https://example.com/items?page=2")
            .unwrap()
            .with_header(
                HeaderName::from_static("accept"),
                HeaderValue::from_static("text/plain"),
            )
            .with_body("payload");

        let http_request = request.clone().into_http();
        assert_eq!(http_request.uri().query(), Some("page=2"));
        assert_eq!(Request::from(http_request), request);
    }
}
