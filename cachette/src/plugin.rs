//! Lifecycle hooks strategies call around fetches and cache writes.
//!
//! Every method has a pass-through default, so a plugin implements only the
//! hooks it cares about. Plugins run in registration order; each one sees
//! the output of the previous one.
//!
//! ```
//! use async_trait::async_trait;
//! use cachette::Plugin;
//! use cachette_core::{Request, Response};
//!
//! /// Refuses to cache responses larger than 1 MiB.
//! struct SizeLimit;
//!
//! #[async_trait]
//! impl Plugin for SizeLimit {
//!     async fn cache_will_update(&self, _request: &Request, response: Response) -> Option<Response> {
//!         (response.body().len() <= 1 << 20).then_some(response)
//!     }
//! }
//! ```

use async_trait::async_trait;
use cachette_core::{CacheEntry, Request, Response};

use crate::NetworkError;

/// Hooks into the strategy request lifecycle.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called before a network fetch; may rewrite the outgoing request.
    async fn request_will_fetch(&self, request: Request) -> Request {
        request
    }

    /// Called when a network fetch produced no response.
    async fn fetch_did_fail(&self, _request: &Request, _error: &NetworkError) {}

    /// Called before a response is stored. Returning `None` skips the write.
    async fn cache_will_update(&self, _request: &Request, response: Response) -> Option<Response> {
        Some(response)
    }

    /// Called after a response was stored.
    async fn cache_did_update(&self, _cache_name: &str, _request: &Request, _response: &Response) {}

    /// Called with the result of a cache lookup before it is used. Returning
    /// `None` turns a hit into a miss.
    async fn cached_response_will_be_used(
        &self,
        _request: &Request,
        cached: Option<CacheEntry>,
    ) -> Option<CacheEntry> {
        cached
    }
}
