//! State and lifecycle shared by all strategies.

use std::fmt;
use std::sync::Arc;

use cachette_backend::{CacheHandle, CacheStore};
use cachette_core::{CacheEntry, Clock, Fetch, Request, Response, SystemClock};
use http::Method;
use smol_str::SmolStr;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CacheResult, NetworkError};
use crate::expiration::ExpirationPolicy;
use crate::offload::OffloadManager;
use crate::{CacheOptions, Plugin, metrics};

struct StrategyCoreInner {
    cache_name: SmolStr,
    options: CacheOptions,
    expiration: Option<ExpirationPolicy>,
    store: Arc<dyn CacheStore>,
    handle: RwLock<Option<Arc<dyn CacheHandle>>>,
    fetcher: Arc<dyn Fetch>,
    offload: OffloadManager,
    clock: Arc<dyn Clock>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Clone for StrategyCoreInner {
    // A reconfigured copy reopens the named cache on first use.
    fn clone(&self) -> Self {
        StrategyCoreInner {
            cache_name: self.cache_name.clone(),
            options: self.options.clone(),
            expiration: self.expiration,
            store: self.store.clone(),
            handle: RwLock::new(None),
            fetcher: self.fetcher.clone(),
            offload: self.offload.clone(),
            clock: self.clock.clone(),
            plugins: self.plugins.clone(),
        }
    }
}

/// Everything a strategy needs: the named cache, the network adapter, the
/// expiration policy and the background task manager.
///
/// Cloning is cheap; background tasks hold their own clone.
#[derive(Clone)]
pub struct StrategyCore {
    inner: Arc<StrategyCoreInner>,
}

impl fmt::Debug for StrategyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyCore")
            .field("cache_name", &self.inner.cache_name)
            .field("options", &self.inner.options)
            .field("clock", &self.inner.clock)
            .field("plugins", &self.inner.plugins.len())
            .finish_non_exhaustive()
    }
}

impl StrategyCore {
    /// Creates the shared state for a strategy writing to `cache_name`.
    ///
    /// The named cache is opened on first use.
    pub fn new(
        cache_name: impl Into<SmolStr>,
        options: CacheOptions,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        StrategyCore {
            inner: Arc::new(StrategyCoreInner {
                cache_name: cache_name.into(),
                expiration: ExpirationPolicy::from_options(&options),
                options,
                store,
                handle: RwLock::new(None),
                fetcher,
                offload: OffloadManager::default(),
                clock: Arc::new(SystemClock),
                plugins: Vec::new(),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut StrategyCoreInner {
        Arc::make_mut(&mut self.inner)
    }

    pub(crate) fn set_offload(&mut self, offload: OffloadManager) {
        self.inner_mut().offload = offload;
    }

    pub(crate) fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.inner_mut().clock = clock;
    }

    pub(crate) fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.inner_mut().plugins.push(plugin);
    }

    /// Name of the cache this strategy reads and writes.
    pub fn cache_name(&self) -> &str {
        &self.inner.cache_name
    }

    /// Options the strategy was built with.
    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Expiration policy derived from the options.
    pub fn expiration(&self) -> Option<&ExpirationPolicy> {
        self.inner.expiration.as_ref()
    }

    /// Manager running this strategy's background tasks.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Store the named cache lives in.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.inner.store
    }

    /// Returns the handle to the named cache, opening it on first use.
    ///
    /// A handle whose cache was deleted from the store is replaced by a fresh
    /// one.
    pub async fn cache(&self) -> CacheResult<Arc<dyn CacheHandle>> {
        if let Some(handle) = self.inner.handle.read().await.as_ref()
            && !handle.is_closed()
        {
            return Ok(handle.clone());
        }

        let mut slot = self.inner.handle.write().await;
        if let Some(handle) = slot.as_ref()
            && !handle.is_closed()
        {
            return Ok(handle.clone());
        }
        let handle = self.inner.store.open(&self.inner.cache_name).await?;
        debug!(cache = %self.inner.cache_name, "opened named cache");
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Looks `request` up in the named cache, ignoring age.
    pub async fn lookup(&self, request: &Request) -> CacheResult<Option<CacheEntry>> {
        let cache = self.cache().await?;
        let mut found = cache
            .match_request(request, &self.inner.options.match_options)
            .await?;
        for plugin in &self.inner.plugins {
            found = plugin.cached_response_will_be_used(request, found).await;
        }
        Ok(found)
    }

    /// Returns `true` if `entry` may still be served.
    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.inner
            .expiration
            .as_ref()
            .is_none_or(|policy| !policy.is_expired(entry, self.inner.clock.now()))
    }

    /// Fetches `request` from the network.
    pub async fn fetch(&self, request: Request) -> Result<Response, NetworkError> {
        let mut outgoing = request.clone();
        for plugin in &self.inner.plugins {
            outgoing = plugin.request_will_fetch(outgoing).await;
        }

        debug!(key = %request.key(), "fetching from network");
        let result = self
            .inner
            .fetcher
            .fetch(outgoing)
            .await
            .map_err(NetworkError::from);
        metrics::record_fetch(&self.inner.cache_name, result.is_ok());

        if let Err(error) = &result {
            self.fetch_failed(&request, error).await;
        }
        result
    }

    /// Fetches `request` unless `signal` is cancelled first.
    ///
    /// On cancellation the fetch is dropped and [`NetworkError::Aborted`] is
    /// returned.
    pub async fn fetch_until(
        &self,
        request: Request,
        signal: &CancellationToken,
    ) -> Result<Response, NetworkError> {
        let key = request.key();
        tokio::select! {
            biased;
            result = self.fetch(request) => result,
            _ = signal.cancelled() => {
                debug!(%key, "network fetch aborted");
                Err(NetworkError::Aborted)
            }
        }
    }

    /// Runs the `fetch_did_fail` hooks.
    pub async fn fetch_failed(&self, request: &Request, error: &NetworkError) {
        debug!(key = %request.key(), %error, "network fetch failed");
        for plugin in &self.inner.plugins {
            plugin.fetch_did_fail(request, error).await;
        }
    }

    /// Stores a network response for `request`.
    ///
    /// Only `GET` requests with successful (2xx) responses are stored, and
    /// plugins may veto or rewrite the response. Returns `true` if an entry
    /// was written.
    pub async fn cache_write(&self, request: &Request, response: Response) -> CacheResult<bool> {
        if request.method() != Method::GET {
            debug!(key = %request.key(), "not caching non-GET request");
            return Ok(false);
        }
        if !response.status().is_success() {
            debug!(key = %request.key(), status = %response.status(), "not caching unsuccessful response");
            return Ok(false);
        }

        let mut response = Some(response);
        for plugin in &self.inner.plugins {
            if let Some(current) = response.take() {
                response = plugin.cache_will_update(request, current).await;
            }
        }
        let Some(response) = response else {
            debug!(key = %request.key(), "cache write vetoed by plugin");
            return Ok(false);
        };

        self.store_entry(request, response).await?;
        Ok(true)
    }

    /// Like [`cache_write`](Self::cache_write), but logs failures instead
    /// of returning them.
    pub async fn cache_write_logged(&self, request: &Request, response: Response) {
        if let Err(error) = self.cache_write(request, response).await {
            warn!(key = %request.key(), %error, "failed to update cache");
        }
    }

    /// Writes an entry without the status guard, then applies expiration.
    pub async fn store_entry(&self, request: &Request, response: Response) -> CacheResult<()> {
        let cache = self.cache().await?;
        let response = response.clear_cache_hit();
        let entry = CacheEntry::new(request.clone(), response.duplicate(), self.inner.clock.now());
        cache.put(entry).await?;
        debug!(key = %request.key(), cache = %self.inner.cache_name, "stored response");
        metrics::record_write(&self.inner.cache_name);

        if let Some(policy) = &self.inner.expiration
            && let Err(error) = policy.evict(cache.as_ref(), self.inner.clock.now()).await
        {
            warn!(cache = %self.inner.cache_name, %error, "cache eviction failed");
        }

        for plugin in &self.inner.plugins {
            plugin
                .cache_did_update(&self.inner.cache_name, request, &response)
                .await;
        }
        Ok(())
    }
}

/// Generates the `with_*` builder methods every strategy shares.
macro_rules! strategy_builders {
    ($strategy:ty) => {
        impl $strategy {
            /// Runs background tasks on `offload` instead of a private manager.
            pub fn with_offload(mut self, offload: $crate::offload::OffloadManager) -> Self {
                self.core.set_offload(offload);
                self
            }

            /// Uses `clock` for entry timestamps and expiration.
            pub fn with_clock(
                mut self,
                clock: ::std::sync::Arc<dyn ::cachette_core::Clock>,
            ) -> Self {
                self.core.set_clock(clock);
                self
            }

            /// Registers a lifecycle plugin.
            pub fn with_plugin(mut self, plugin: ::std::sync::Arc<dyn $crate::Plugin>) -> Self {
                self.core.add_plugin(plugin);
                self
            }

            /// Returns the shared strategy state.
            pub fn core(&self) -> &$crate::strategy::StrategyCore {
                &self.core
            }
        }
    };
}

pub(crate) use strategy_builders;
