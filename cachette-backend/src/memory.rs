//! In-process cache store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cachette_core::{CacheEntry, MatchOptions, Request, RequestKey};
use dashmap::DashMap;
use http::Method;
use indexmap::IndexMap;
use smol_str::SmolStr;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{CacheHandle, CacheStore, StoreError, StoreResult};

/// In-memory [`CacheStore`].
///
/// Each named cache keeps its entries in insertion order; storing an entry
/// under an existing key moves it to the end. Cloning the store is cheap and
/// clones share the same caches.
///
/// ```
/// use cachette_backend::{CacheStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let cache = store.open("cache-text-demo").await.unwrap();
/// assert_eq!(cache.name(), "cache-text-demo");
/// assert!(store.has("cache-text-demo").await.unwrap());
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    caches: Arc<DashMap<SmolStr, Arc<MemoryCache>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn CacheHandle>> {
        let cache = self
            .caches
            .entry(SmolStr::new(name))
            .or_insert_with(|| {
                debug!(cache = name, "created named cache");
                Arc::new(MemoryCache::new(name))
            })
            .value()
            .clone();
        Ok(cache)
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        match self.caches.remove(name) {
            Some((_, cache)) => {
                cache.close();
                debug!(cache = name, "deleted named cache");
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

/// A named cache owned by a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryCache {
    name: SmolStr,
    entries: RwLock<IndexMap<RequestKey, CacheEntry>>,
    closed: AtomicBool,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        MemoryCache {
            name: SmolStr::new(name),
            entries: RwLock::new(IndexMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            Err(StoreError::Closed(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheHandle for MemoryCache {
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
        let key = request.key();
        let entries = self.entries.read().await;

        if options.is_exact() {
            return Ok(entries
                .get(&key)
                .filter(|entry| options.matches(entry, request, &key))
                .cloned());
        }

        Ok(entries
            .values()
            .find(|entry| options.matches(entry, request, &key))
            .cloned())
    }

    #[tracing::instrument(skip(self, entry), fields(cache = %self.name, key = %entry.key()), level = "trace")]
    async fn put(&self, entry: CacheEntry) -> StoreResult<()> {
        self.ensure_open()?;
        let method = entry.request().method();
        if method != Method::GET {
            return Err(StoreError::UnsupportedMethod(method.clone()));
        }

        let mut entries = self.entries.write().await;
        entries.shift_remove(entry.key());
        entries.insert(entry.key().clone(), entry);
        Ok(())
    }

    #[tracing::instrument(skip(self, request, options), fields(cache = %self.name), level = "trace")]
    async fn delete(&self, request: &Request, options: &MatchOptions) -> StoreResult<bool> {
        self.ensure_open()?;
        let key = request.key();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !options.matches(entry, request, &key));
        Ok(entries.len() != before)
    }

    #[tracing::instrument(skip(self, entry), fields(cache = %self.name, key = %entry.key()), level = "trace")]
    async fn remove_entry(&self, entry: &CacheEntry) -> StoreResult<bool> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        if entries.get(entry.key()) != Some(entry) {
            return Ok(false);
        }
        entries.shift_remove(entry.key());
        Ok(true)
    }

    async fn keys(&self) -> StoreResult<Vec<Request>> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .map(|entry| entry.request().clone())
            .collect())
    }

    async fn entries(&self) -> StoreResult<Vec<CacheEntry>> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        Ok(entries.values().cloned().collect())
    }
}
