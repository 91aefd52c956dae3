use std::sync::Arc;

use async_trait::async_trait;
use cachette_backend::CacheStore;
use cachette_core::{Fetch, Request, Response};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CacheStrategy, StrategyCore, caller_error, strategy_builders};
use crate::error::{CacheError, CacheResult};
use crate::offload::OffloadKey;
use crate::{CacheOptions, metrics};

/// Serves whatever is stored right away and refreshes it in the background.
///
/// A hit is returned immediately, whatever its age, and a revalidation fetch
/// is handed to the offload manager. The next call sees the refreshed entry
/// once that fetch settled. On a miss the network response is awaited,
/// stored and returned.
///
/// Revalidations of the same request into the same cache are deduplicated
/// while one is in flight, unless the offload manager is configured
/// otherwise. Strategies sharing a manager but writing other caches refresh
/// independently.
#[derive(Debug)]
pub struct StaleWhileRevalidate {
    core: StrategyCore,
}

impl StaleWhileRevalidate {
    /// Creates a Stale-While-Revalidate strategy writing to `cache_name`.
    pub fn new(
        cache_name: impl Into<SmolStr>,
        options: CacheOptions,
        store: Arc<dyn CacheStore>,
        fetch: Arc<dyn Fetch>,
    ) -> Self {
        StaleWhileRevalidate {
            core: StrategyCore::new(cache_name, options, store, fetch),
        }
    }

    fn revalidate(&self, request: Request) {
        let core = self.core.clone();
        let key = request.key();
        let task = OffloadKey::request(self.core.cache_name(), key.clone());
        let spawned = self.core.offload().spawn_with_key(task, async move {
            let response = core.fetch(request.clone()).await?;
            core.cache_write(&request, response).await?;
            Ok::<(), CacheError>(())
        });
        if spawned {
            debug!(%key, "revalidating in background");
        }
    }
}

strategy_builders!(StaleWhileRevalidate);

#[async_trait]
impl CacheStrategy for StaleWhileRevalidate {
    fn name(&self) -> &'static str {
        "stale-while-revalidate"
    }

    fn cache_name(&self) -> &str {
        self.core.cache_name()
    }

    async fn handle(&self, request: Request, signal: CancellationToken) -> CacheResult<Response> {
        let key = request.key();

        if let Some(entry) = self.core.lookup(&request).await? {
            debug!(%key, fresh = self.core.is_fresh(&entry), "cache hit");
            metrics::record_hit(self.name(), self.cache_name());
            self.revalidate(request);
            return Ok(entry.into_response().mark_cache_hit());
        }

        debug!(%key, "cache miss");
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
