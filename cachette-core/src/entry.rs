//! Stored cache entries.

use chrono::{DateTime, TimeDelta, Utc};

use crate::key::RequestKey;
use crate::request::Request;
use crate::response::Response;

/// A response stored in a named cache.
///
/// Keeps the request that produced the response (for `Vary` matching and
/// key enumeration) and the moment it was written, which expiration policies
/// compare against.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    key: RequestKey,
    request: Request,
    response: Response,
    stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry for `request`, stored at `stored_at`.
    pub fn new(request: Request, response: Response, stored_at: DateTime<Utc>) -> Self {
        CacheEntry {
            key: request.key(),
            request,
            response,
            stored_at,
        }
    }

    /// Returns the normalized identity of the stored request.
    #[inline]
    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    /// Returns the request the response was stored for.
    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the stored response.
    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns when the entry was written.
    #[inline]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Returns how old the entry is at `now`.
    ///
    /// Negative ages (clock moved backwards) are clamped to zero.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.stored_at).max(TimeDelta::zero())
    }

    /// Consumes the entry and returns the stored response.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Consumes the entry and returns request and response separately.
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}
