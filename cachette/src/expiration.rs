//! Age and size limits for named caches.

use std::time::Duration;

use cachette_backend::{CacheHandle, StoreResult};
use cachette_core::CacheEntry;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::CacheOptions;

/// Expiration limits applied to one named cache.
///
/// An entry is expired once `now >= stored_at + max_age`. When the cache
/// holds more than `max_entries` live entries, the oldest ones are evicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    max_age: Option<Duration>,
    max_entries: Option<usize>,
}

impl ExpirationPolicy {
    /// Creates a policy from explicit limits.
    pub fn new(max_age: Option<Duration>, max_entries: Option<usize>) -> Self {
        ExpirationPolicy {
            max_age,
            max_entries,
        }
    }

    /// Builds the policy configured by `options`, or `None` when no limit is
    /// set.
    pub fn from_options(options: &CacheOptions) -> Option<Self> {
        if options.max_age.is_none() && options.max_entries.is_none() {
            None
        } else {
            Some(Self::new(options.max_age, options.max_entries))
        }
    }

    /// Maximum entry age.
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Maximum number of entries.
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Returns `true` if `entry` is too old to be served at `now`.
    pub fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };
        let Ok(max_age) = TimeDelta::from_std(max_age) else {
            return false;
        };
        entry
            .stored_at()
            .checked_add_signed(max_age)
            .is_some_and(|expires_at| now >= expires_at)
    }

    /// Removes expired entries, then the oldest live entries until at most
    /// `max_entries` remain.
    ///
    /// Entries stored at the same instant are evicted in insertion order.
    /// Returns the number of deleted entries.
    pub async fn evict(&self, cache: &dyn CacheHandle, now: DateTime<Utc>) -> StoreResult<usize> {
        let (mut doomed, mut live): (Vec<_>, Vec<_>) = cache
            .entries()
            .await?
            .into_iter()
            .partition(|entry| self.is_expired(entry, now));

        if let Some(max_entries) = self.max_entries
            && live.len() > max_entries
        {
            live.sort_by_key(CacheEntry::stored_at);
            let excess = live.len() - max_entries;
            doomed.extend(live.drain(..excess));
        }

        // Entries rewritten since the snapshot are newer than what was judged.
        let mut removed = 0;
        for entry in &doomed {
            if cache.remove_entry(entry).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(cache = cache.name(), removed, "evicted cache entries");
            crate::metrics::record_eviction(cache.name(), removed);
        }
        Ok(removed)
    }
}
