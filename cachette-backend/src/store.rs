use std::sync::Arc;

use async_trait::async_trait;
use cachette_core::{CacheEntry, MatchOptions, Request};
use smol_str::SmolStr;

use crate::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A collection of named caches.
///
/// Opening a name that does not exist creates it. Handles are shared: two
/// `open` calls with the same name return handles to the same entries, and
/// concurrent writers are not coordinated (last write wins).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Opens (creating if needed) the cache called `name`.
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn CacheHandle>>;

    /// Deletes the cache called `name` with all its entries.
    ///
    /// Returns `false` if no such cache existed. Outstanding handles become
    /// closed.
    async fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Returns `true` if a cache called `name` exists.
    async fn has(&self, name: &str) -> StoreResult<bool>;

    /// Returns the names of all existing caches.
    async fn names(&self) -> StoreResult<Vec<SmolStr>>;
}

/// One named cache.
#[async_trait]
pub trait CacheHandle: Send + Sync {
    /// Name this handle was opened with.
    fn name(&self) -> &str;

    /// Returns `true` once the cache was deleted from its store.
    ///
    /// Closed handles fail every operation with [`StoreError::Closed`].
    fn is_closed(&self) -> bool;

    /// Returns the first stored entry matching `request`.
    async fn match_request(
        &self,
        request: &Request,
        options: &MatchOptions,
    ) -> StoreResult<Option<CacheEntry>>;

    /// Stores `entry`, replacing any entry with the same request key.
    ///
    /// Fails with [`StoreError::UnsupportedMethod`] for non-`GET` requests.
    async fn put(&self, entry: CacheEntry) -> StoreResult<()>;

    /// Removes every entry matching `request`. Returns `true` if anything
    /// was removed.
    async fn delete(&self, request: &Request, options: &MatchOptions) -> StoreResult<bool>;

    /// Removes `entry` only if it is still the entry stored under its key.
    ///
    /// A newer write for the same request is left in place. Returns `true`
    /// if the entry was removed.
    async fn remove_entry(&self, entry: &CacheEntry) -> StoreResult<bool>;

    /// Returns the stored requests.
    async fn keys(&self) -> StoreResult<Vec<Request>>;

    /// Returns a snapshot of all stored entries.
    ///
    /// Stores that track insertion order return entries oldest first.
    async fn entries(&self) -> StoreResult<Vec<CacheEntry>>;
}

#[async_trait]
impl CacheStore for Arc<dyn CacheStore> {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn CacheHandle>> {
        (**self).open(name).await
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        (**self).delete(name).await
    }

    async fn has(&self, name: &str) -> StoreResult<bool> {
        (**self).has(name).await
    }

    async fn names(&self) -> StoreResult<Vec<SmolStr>> {
        (**self).names().await
    }
}

#[async_trait]
impl CacheStore for Box<dyn CacheStore> {
    async fn open(&self, name: &str) -> StoreResult<Arc<dyn CacheHandle>> {
        (**self).open(name).await
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        (**self).delete(name).await
    }

    async fn has(&self, name: &str) -> StoreResult<bool> {
        (**self).has(name).await
    }

    async fn names(&self) -> StoreResult<Vec<SmolStr>> {
        (**self).names().await
    }
}
