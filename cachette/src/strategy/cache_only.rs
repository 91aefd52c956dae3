use std::sync::Arc;

use async_trait::async_trait;
use cachette_backend::{CacheStore, StoreError};
use cachette_core::{Fetch, Request, Response};
use http::Method;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AddToCache, CacheStrategy, StrategyCore, strategy_builders};
use crate::error::{CacheError, CacheResult};
use crate::{CacheOptions, metrics};

/// Serves stored responses and never touches the network.
///
/// A hit is returned when the entry exists and, if `max_age` is set, is still
/// fresh. Everything else fails with [`CacheError::CacheMiss`]. The cache is
/// filled through [`AddToCache::add_to_cache`] or by other strategies sharing
/// the same cache name.
///
/// The network adapter passed to [`CacheOnly::new`] is kept only so every
/// strategy is built the same way; it is never called.
#[derive(Debug)]
pub struct CacheOnly {
    core: StrategyCore,
}

impl CacheOnly {
    /// Creates a Cache Only strategy reading from `cache_name`.
    pub fn new(
        cache_name: impl Into<SmolStr>,
        options: CacheOptions,
        store: Arc<dyn CacheStore>,
        fetch: Arc<dyn Fetch>,
    ) -> Self {
        CacheOnly {
            core: StrategyCore::new(cache_name, options, store, fetch),
        }
    }
}

strategy_builders!(CacheOnly);

#[async_trait]
impl CacheStrategy for CacheOnly {
    fn name(&self) -> &'static str {
        "cache-only"
    }

    fn cache_name(&self) -> &str {
        self.core.cache_name()
    }

    async fn handle(&self, request: Request, _signal: CancellationToken) -> CacheResult<Response> {
        let key = request.key();

        match self.core.lookup(&request).await? {
            Some(entry) if self.core.is_fresh(&entry) => {
                debug!(%key, "cache hit");
                metrics::record_hit(self.name(), self.cache_name());
                Ok(entry.into_response().mark_cache_hit())
            }
            stale => {
                debug!(%key, expired = stale.is_some(), "cache miss");
                metrics::record_miss(self.name(), self.cache_name());
                Err(CacheError::CacheMiss { key })
            }
        }
    }
}

#[async_trait]
impl AddToCache for CacheOnly {
    async fn add_to_cache(&self, request: Request, response: Response) -> CacheResult<()> {
        if request.method() != Method::GET {
            return Err(StoreError::UnsupportedMethod(request.method().clone()).into());
        }
        self.core.store_entry(&request, response).await
    }
}
