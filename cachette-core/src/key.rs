//! Normalized request identity.
//!
//! Stores index responses by [`RequestKey`]. Two requests that mean the same
//! resource must produce equal keys, so the URL is normalized:
//!
//! - scheme and host are lower-cased
//! - default ports (`80` for http, `443` for https) are dropped
//! - an empty path becomes `/`
//! - the query string is kept verbatim
//!
//! Fragments never reach the key because [`Request::get`](crate::Request::get)
//! strips them before parsing.
//!
//! ```
//! use cachette_core::Request;
//!
//! let a = Request::get("https://Example.COM:443").unwrap();
//! let b = Request::get("https://example.com/").unwrap();
//! assert_eq!(a.key(), b.key());
//! assert_eq!(a.key().to_string(), "GET https://example.com/");
//! ```
//!
//! [`RequestKey`] wraps its data in an `Arc`, so cloning a key only bumps a
//! reference count.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::{Method, Uri};
use smol_str::SmolStr;

#[derive(Debug, PartialEq, Eq, Hash)]
struct RequestKeyInner {
    method: Method,
    url: SmolStr,
}

/// Normalized identity of a request: method plus normalized URL.
#[derive(Clone, Debug)]
pub struct RequestKey {
    inner: Arc<RequestKeyInner>,
}

impl PartialEq for RequestKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for RequestKey {}

impl Hash for RequestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl RequestKey {
    /// Builds the key for a method and URI.
    pub fn new(method: &Method, uri: &Uri) -> Self {
        RequestKey {
            inner: Arc::new(RequestKeyInner {
                method: method.clone(),
                url: normalize(uri),
            }),
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Returns the normalized URL, including the query string.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the normalized URL without its query string.
    pub fn url_without_search(&self) -> &str {
        self.inner
            .url
            .split_once('?')
            .map_or(self.inner.url.as_str(), |(head, _)| head)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.method, self.inner.url)
    }
}

fn normalize(uri: &Uri) -> SmolStr {
    let mut url = String::new();
    let scheme = uri.scheme_str().map(str::to_ascii_lowercase);

    if let Some(scheme) = &scheme {
        url.push_str(scheme);
        url.push_str("://");
    }

    if let Some(authority) = uri.authority() {
        url.push_str(&authority.host().to_ascii_lowercase());
        if let Some(port) = authority.port_u16() {
            let default_port = matches!(
                (scheme.as_deref(), port),
                (Some("http"), 80) | (Some("https"), 443)
            );
            if !default_port {
                url.push(':');
                url.push_str(&port.to_string());
            }
        }
    }

    let path = uri.path();
    if path.is_empty() {
        url.push('/');
    } else {
        url.push_str(path);
    }

    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }

    SmolStr::from(url)
}
