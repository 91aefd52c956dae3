//! Moka store implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cachette_backend::{CacheHandle, CacheStore, StoreError, StoreResult};
use cachette_core::{CacheEntry, MatchOptions, Request, RequestKey};
use dashmap::DashMap;
use http::Method;
use moka::future::{Cache, CacheBuilder};
use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use smol_str::SmolStr;
use tracing::debug;

use crate::builder::{MokaStoreBuilder, NoCapacity};

#[derive(Clone)]
pub(crate) struct CacheSettings {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) eviction_policy: Option<EvictionPolicy>,
}

impl CacheSettings {
    fn build_cache(&self, name: &str) -> Cache<RequestKey, CacheEntry> {
        let mut builder = CacheBuilder::default().name(name);
        if let Some(capacity) = self.max_capacity {
            builder = builder.max_capacity(capacity);
        }
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        let policy = self
            .eviction_policy
            .clone()
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        builder.eviction_policy(policy).build()
    }
}

/// [`CacheStore`] keeping each named cache in its own Moka cache.
///
/// Cloning the store is cheap and clones share the same caches.
#[derive(Clone)]
pub struct MokaStore {
    caches: Arc<DashMap<SmolStr, Arc<MokaCache>>>,
    settings: Arc<CacheSettings>,
}

impl fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaStore")
            .field("caches", &self.caches.len())
            .field("max_capacity", &self.settings.max_capacity)
            .field("time_to_live", &self.settings.time_to_live)
            .finish()
    }
}

impl MokaStore {
    /// Creates a new builder for `MokaStore`.
    pub fn builder() -> MokaStoreBuilder<NoCapacity> {
        MokaStoreBuilder::new()
    }

    pub(crate) fn from_settings(settings: CacheSettings) -> Self {
        MokaStore {
            caches: Arc::new(DashMap::new()),
            settings: Arc::new(settings),
        }
    }

    /// Opens (creating if needed) the cache called `name`, returning the
    /// concrete handle.
    pub fn cache(&self, name: &str) -> Arc<MokaCache> {
        self.caches
            .entry(SmolStr::new(name))
            .or_insert_with(|| {
                debug!(cache = name, "created named moka cache");
                Arc::new(MokaCache {
                    name: SmolStr::new(name),
                    cache: self.settings.build_cache(name),
                    closed: AtomicBool::new(false),
                })
            })
            .value()
            .clone()
    }
}

#[async_trait]
impl CacheStore for MokaStore {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn CacheHandle>> {
        Ok(self.cache(name))
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        match self.caches.remove(name) {
            Some((_, cache)) => {
                cache.closed.store(true, Ordering::Release);
                cache.cache.invalidate_all();
                debug!(cache = name, "deleted named moka cache");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has(&self, name: &str) -> StoreResult<bool> {
        Ok(self.caches.contains_key(name))
    }

    async fn names(&self) -> StoreResult<Vec<SmolStr>> {
        Ok(self.caches.iter().map(|cache| cache.key().clone()).collect())
    }
}

/// A named cache owned by a [`MokaStore`].
pub struct MokaCache {
    name: SmolStr,
    cache: Cache<RequestKey, CacheEntry>,
    closed: AtomicBool,
}

impl fmt::Debug for MokaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MokaCache")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish()
    }
}

impl MokaCache {
    /// Returns the underlying Moka cache.
    pub fn inner(&self) -> &Cache<RequestKey, CacheEntry> {
        &self.cache
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::Closed(self.name.clone()))
        } else {
            Ok(())
        }
    }

    fn matching(&self, request: &Request, options: &MatchOptions) -> Vec<CacheEntry> {
        let key = request.key();
        let mut found: Vec<CacheEntry> = self
            .cache
            .iter()
            .filter(|(_, entry)| options.matches(entry, request, &key))
            .map(|(_, entry)| entry)
            .collect();
        found.sort_by_key(CacheEntry::stored_at);
        found
    }

    fn sorted_entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.cache.iter().map(|(_, entry)| entry).collect();
        entries.sort_by_key(CacheEntry::stored_at);
        entries
    }
}

#[async_trait]
impl CacheHandle for MokaCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[tracing::instrument(skip(self, request, options), fields(cache = %self.name), level = "trace")]
    async fn match_request(
        &self,
        request: &Request,
        options: &MatchOptions,
    ) -> StoreResult<Option<CacheEntry>> {
        self.ensure_open()?;
        if options.is_exact() {
            let key = request.key();
            return Ok(self
                .cache
                .get(&key)
                .await
                .filter(|entry| options.matches(entry, request, &key)));
        }
        Ok(self.matching(request, options).into_iter().next())
    }

    #[tracing::instrument(skip(self, entry), fields(cache = %self.name, key = %entry.key()), level = "trace")]
    async fn put(&self, entry: CacheEntry) -> StoreResult<()> {
        self.ensure_open()?;
        let method = entry.request().method();
        if method != Method::GET {
            return Err(StoreError::UnsupportedMethod(method.clone()));
        }
        self.cache.insert(entry.key().clone(), entry).await;
        Ok(())
    }

    #[tracing::instrument(skip(self, request, options), fields(cache = %self.name), level = "trace")]
    async fn delete(&self, request: &Request, options: &MatchOptions) -> StoreResult<bool> {
        self.ensure_open()?;
        let mut removed = false;
        for entry in self.matching(request, options) {
            removed |= self.cache.remove(entry.key()).await.is_some();
        }
        Ok(removed)
    }

    #[tracing::instrument(skip(self, entry), fields(cache = %self.name, key = %entry.key()), level = "trace")]
    async fn remove_entry(&self, entry: &CacheEntry) -> StoreResult<bool> {
        self.ensure_open()?;
        let outcome = self
            .cache
            .entry_by_ref(entry.key())
            .and_compute_with(|current| {
                let op = match current {
                    Some(current) if current.value() == entry => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(outcome, CompResult::Removed(_)))
    }

    async fn keys(&self) -> StoreResult<Vec<Request>> {
        self.ensure_open()?;
        Ok(self
            .sorted_entries()
            .into_iter()
            .map(|entry| entry.into_parts().0)
            .collect())
    }

    async fn entries(&self) -> StoreResult<Vec<CacheEntry>> {
        self.ensure_open()?;
        Ok(self.sorted_entries())
    }
}
