//! Declarative strategy configuration.
//!
//! Strategies can be described in YAML or JSON and built against a store and
//! a network adapter at runtime:
//!
//! ```
//! use std::sync::Arc;
//! use cachette::{CacheStrategy, StrategyConfig};
//! use cachette_backend::MemoryStore;
//! use cachette_core::{Request, Response, fetch_fn};
//!
//! let config = StrategyConfig::from_yaml(
//!     r#"
//! type: NetworkFirst
//! cache_name: network-text-demo
//! options:
//!   network_timeout: 3s
//!   max_entries: 50
//! "#,
//! )
//! .unwrap();
//!
//! let fetch = fetch_fn(|_request: Request| async { Ok(Response::new("ok")) });
//! let strategy = config.build(Arc::new(MemoryStore::new()), Arc::new(fetch));
//! assert_eq!(strategy.name(), "network-first");
//! assert_eq!(strategy.cache_name(), "network-text-demo");
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use cachette_backend::CacheStore;
use cachette_core::Fetch;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::CacheOptions;
use crate::offload::{OffloadConfig, OffloadManager};
use crate::strategy::{CacheFirst, CacheOnly, NetworkFirst, StaleWhileRevalidate, Strategy};

/// Error raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    /// The JSON document could not be parsed.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Two strategies of the same kind share a cache name.
    #[error("strategy {strategy} is configured twice for cache {cache_name:?}")]
    Duplicate {
        /// Strategy type.
        strategy: &'static str,
        /// Shared cache name.
        cache_name: SmolStr,
    },
}

/// Settings common to every strategy type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StrategySettings {
    /// Named cache the strategy reads and writes.
    #[serde(alias = "cacheName")]
    pub cache_name: SmolStr,
    /// Expiration, timeout and matching options.
    #[serde(default)]
    pub options: CacheOptions,
}

/// One strategy, selected by its `type` field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    /// Builds a [`CacheFirst`].
    CacheFirst(StrategySettings),
    /// Builds a [`NetworkFirst`].
    NetworkFirst(StrategySettings),
    /// Builds a [`CacheOnly`].
    CacheOnly(StrategySettings),
    /// Builds a [`StaleWhileRevalidate`].
    StaleWhileRevalidate(StrategySettings),
}

impl StrategyConfig {
    /// Parses a single strategy from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Parses a single strategy from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The `type` tag of this configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::CacheFirst(_) => "CacheFirst",
            StrategyConfig::NetworkFirst(_) => "NetworkFirst",
            StrategyConfig::CacheOnly(_) => "CacheOnly",
            StrategyConfig::StaleWhileRevalidate(_) => "StaleWhileRevalidate",
        }
    }

    /// Settings shared by all strategy types.
    pub fn settings(&self) -> &StrategySettings {
        match self {
            StrategyConfig::CacheFirst(settings)
            | StrategyConfig::NetworkFirst(settings)
            | StrategyConfig::CacheOnly(settings)
            | StrategyConfig::StaleWhileRevalidate(settings) => settings,
        }
    }

    /// Builds the configured strategy.
    pub fn build(self, store: Arc<dyn CacheStore>, fetch: Arc<dyn Fetch>) -> Strategy {
        match self {
            StrategyConfig::CacheFirst(StrategySettings {
                cache_name,
                options,
            }) => CacheFirst::new(cache_name, options, store, fetch).into(),
            StrategyConfig::NetworkFirst(StrategySettings {
                cache_name,
                options,
            }) => NetworkFirst::new(cache_name, options, store, fetch).into(),
            StrategyConfig::CacheOnly(StrategySettings {
                cache_name,
                options,
            }) => CacheOnly::new(cache_name, options, store, fetch).into(),
            StrategyConfig::StaleWhileRevalidate(StrategySettings {
                cache_name,
                options,
            }) => StaleWhileRevalidate::new(cache_name, options, store, fetch).into(),
        }
    }
}

/// A set of strategies sharing one store, one network adapter and one
/// background task manager.
///
/// ```yaml
/// offload:
///   timeout:
///     policy: cancel
///     after: 5s
/// strategies:
///   - type: StaleWhileRevalidate
///     cache_name: swr-text-demo
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CachetteConfig {
    /// Background task limits shared by all strategies.
    #[serde(default)]
    pub offload: OffloadConfig,
    /// Configured strategies, in declaration order.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

impl CachetteConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: CachetteConfig = serde_saphyr::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CachetteConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects two strategies of the same type writing the same cache.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for strategy in &self.strategies {
            let cache_name = &strategy.settings().cache_name;
            if !seen.insert((strategy.kind(), cache_name)) {
                return Err(ConfigError::Duplicate {
                    strategy: strategy.kind(),
                    cache_name: cache_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Creates a manager configured by the `offload` section.
    pub fn offload_manager(&self) -> OffloadManager {
        OffloadManager::new(self.offload.clone())
    }

    /// Builds every configured strategy against `store` and `fetch`, on a
    /// fresh manager from [`offload_manager`](Self::offload_manager).
    pub fn build(self, store: Arc<dyn CacheStore>, fetch: Arc<dyn Fetch>) -> Vec<Strategy> {
        let offload = self.offload_manager();
        self.build_with_offload(store, fetch, offload)
    }

    /// Builds every configured strategy, running their background work on
    /// `offload`.
    pub fn build_with_offload(
        self,
        store: Arc<dyn CacheStore>,
        fetch: Arc<dyn Fetch>,
        offload: OffloadManager,
    ) -> Vec<Strategy> {
        self.strategies
            .into_iter()
            .map(|strategy| {
                strategy
                    .build(store.clone(), fetch.clone())
                    .with_offload(offload.clone())
            })
            .collect()
    }
}
