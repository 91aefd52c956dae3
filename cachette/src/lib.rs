#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Strategy configuration loaded from YAML or JSON.
///
/// [`StrategyConfig`] selects one of the four strategies by its `type` field;
/// [`CachetteConfig`] groups several of them.
pub mod config;

/// Error types returned by strategies.
///
/// Defines [`CacheError`] which covers:
/// - Network failures with nothing to fall back to
/// - Cache misses of strategies that never fetch
/// - Combined network and cache failures
/// - Store failures and cancellation
pub mod error;

/// Age and count based expiration of named caches.
pub mod expiration;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, strategies count hits, misses,
/// network fetches, cache writes and evictions per cache name, and the
/// offload manager counts background tasks.
pub mod metrics;

/// Background task offloading for revalidation and late network responses.
pub mod offload;

mod options;

/// Lifecycle hooks run by strategies.
pub mod plugin;

/// The caching strategies.
pub mod strategy;

pub use config::{CachetteConfig, ConfigError, StrategyConfig, StrategySettings};
pub use error::{CacheError, CacheResult, NetworkError};
pub use expiration::ExpirationPolicy;
pub use options::{CacheOptions, CacheOptionsBuilder};
pub use plugin::Plugin;
pub use strategy::{
    AddToCache, CacheFirst, CacheOnly, CacheStrategy, CacheStrategyExt, NetworkFirst,
    StaleWhileRevalidate, Strategy, StrategyCore,
};

pub use cachette_core::{CACHE_HIT_HEADER, MatchOptions, Request, Response};

/// The `cachette` prelude.
///
/// ```rust
/// use cachette::prelude::*;
/// ```
///
/// This imports the strategies, their shared traits, [`CacheOptions`] and
/// [`CacheError`].
pub mod prelude {
    pub use crate::{
        AddToCache, CacheError, CacheFirst, CacheOnly, CacheOptions, CacheStrategy,
        CacheStrategyExt, NetworkFirst, StaleWhileRevalidate, Strategy,
    };
}
