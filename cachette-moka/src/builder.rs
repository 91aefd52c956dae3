//! Builder for configuring [`MokaStore`].

use std::time::Duration;

use moka::policy::EvictionPolicy;

use crate::store::{CacheSettings, MokaStore};

/// Marker type: capacity has not been configured yet.
///
/// This is the initial state of a [`MokaStoreBuilder`]. Call either
/// [`max_entries()`](MokaStoreBuilder::max_entries) or
/// [`unbounded()`](MokaStoreBuilder::unbounded) before calling `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: every named cache holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: named caches are not limited by Moka.
///
/// The strategies' `max_entries` option still applies.
#[derive(Debug, Clone, Copy)]
pub struct Unbounded;

/// Builder for creating and configuring a [`MokaStore`].
///
/// Use [`MokaStore::builder`] to create a new builder instance.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cachette_moka::{EvictionPolicy, MokaStore};
///
/// let store = MokaStore::builder()
///     .max_entries(500)
///     .eviction_policy(EvictionPolicy::lru())
///     .time_to_live(Duration::from_secs(60))
///     .build();
/// ```
pub struct MokaStoreBuilder<Cap> {
    capacity: Cap,
    time_to_live: Option<Duration>,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaStoreBuilder<NoCapacity> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        MokaStoreBuilder {
            capacity: NoCapacity,
            time_to_live: None,
            eviction_policy: None,
        }
    }

    /// Limits every named cache to `capacity` entries.
    ///
    /// Moka evicts entries on its own schedule once the limit is exceeded.
    pub fn max_entries(self, capacity: u64) -> MokaStoreBuilder<EntryCapacity> {
        MokaStoreBuilder {
            capacity: EntryCapacity(capacity),
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Leaves named caches without a Moka capacity limit.
    pub fn unbounded(self) -> MokaStoreBuilder<Unbounded> {
        MokaStoreBuilder {
            capacity: Unbounded,
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl Default for MokaStoreBuilder<NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap> MokaStoreBuilder<Cap> {
    /// Drops entries this long after they were written.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Sets the eviction policy used once a capacity limit is reached.
    ///
    /// # Default
    ///
    /// [`EvictionPolicy::tiny_lfu()`]
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaStoreBuilder<EntryCapacity> {
    /// Builds the [`MokaStore`].
    pub fn build(self) -> MokaStore {
        MokaStore::from_settings(CacheSettings {
            max_capacity: Some(self.capacity.0),
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
        })
    }
}

impl MokaStoreBuilder<Unbounded> {
    /// Builds the [`MokaStore`].
    pub fn build(self) -> MokaStore {
        MokaStore::from_settings(CacheSettings {
            max_capacity: None,
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
        })
    }
}
