use std::sync::Arc;

use async_trait::async_trait;
use cachette_backend::CacheStore;
use cachette_core::{Fetch, Request, Response};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CacheStrategy, StrategyCore, caller_error, strategy_builders};
use crate::error::CacheResult;
use crate::{CacheOptions, metrics};

/// Serves fresh cached responses and goes to the network otherwise.
///
/// A hit is returned without touching the network. On a miss, or when the
/// entry is older than `max_age`, the network response is stored and
/// returned. An expired entry is never served, not even when the network
/// fails.
///
/// ```
/// use std::sync::Arc;
/// use cachette::{CacheFirst, CacheOptions, CacheStrategyExt};
/// use cachette_backend::MemoryStore;
/// use cachette_core::{Request, Response, fetch_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetch = fetch_fn(|_request: Request| async { Ok(Response::new("fresh")) });
/// let strategy = CacheFirst::new(
///     "cache-text-demo",
///     CacheOptions::builder().max_age_seconds(20).build(),
///     Arc::new(MemoryStore::new()),
///     Arc::new(fetch),
/// );
///
/// let first = strategy.handle_request("/api/cache-first").await.unwrap();
/// assert!(!first.is_cache_hit());
/// let second = strategy.handle_request("/api/cache-first").await.unwrap();
/// assert!(second.is_cache_hit());
/// # }
/// ```
#[derive(Debug)]
pub struct CacheFirst {
    core: StrategyCore,
}

impl CacheFirst {
    /// Creates a Cache First strategy writing to `cache_name`.
    pub fn new(
        cache_name: impl Into<SmolStr>,
        options: CacheOptions,
        store: Arc<dyn CacheStore>,
        fetch: Arc<dyn Fetch>,
    ) -> Self {
        CacheFirst {
            core: StrategyCore::new(cache_name, options, store, fetch),
        }
    }
}

strategy_builders!(CacheFirst);

#[async_trait]
impl CacheStrategy for CacheFirst {
    fn name(&self) -> &'static str {
        "cache-first"
    }

    fn cache_name(&self) -> &str {
        self.core.cache_name()
    }

    async fn handle(&self, request: Request, signal: CancellationToken) -> CacheResult<Response> {
        let key = request.key();

        match self.core.lookup(&request).await? {
            Some(entry) if self.core.is_fresh(&entry) => {
                debug!(%key, "cache hit");
                metrics::record_hit(self.name(), self.cache_name());
                return Ok(entry.into_response().mark_cache_hit());
            }
            Some(_) => debug!(%key, "cached entry expired"),
            None => debug!(%key, "cache miss"),
        }
        metrics::record_miss(self.name(), self.cache_name());

        let response = self
            .core
            .fetch_until(request.clone(), &signal)
            .await
            .map_err(caller_error)?;
        self.core
            .cache_write_logged(&request, response.duplicate())
            .await;
        Ok(response)
    }
}
