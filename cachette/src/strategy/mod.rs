//! The four caching strategies and the interface they share.
//!
//! | strategy | reads | network | on failure |
//! |----------|-------|---------|------------|
//! | [`CacheFirst`] | fresh entry first | on miss or expiry | [`CacheError::Network`] |
//! | [`NetworkFirst`] | after network failure or timeout | first | [`CacheError::CombinedFailure`] |
//! | [`CacheOnly`] | fresh entry only | never | [`CacheError::CacheMiss`] |
//! | [`StaleWhileRevalidate`] | any entry, refreshed in background | on miss | [`CacheError::Network`] |
//!
//! Responses served from the cache carry `x-cache-hit: true`.

use std::future::Future;

use async_trait::async_trait;
use cachette_core::{IntoRequest, Request, Response};
use tokio_util::sync::CancellationToken;

use crate::error::{CacheError, CacheResult};
use crate::offload::OffloadManager;

mod base;
mod cache_first;
mod cache_only;
mod network_first;
mod stale_while_revalidate;

pub use base::StrategyCore;
pub(crate) use base::strategy_builders;
pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use stale_while_revalidate::StaleWhileRevalidate;

/// A policy deciding where a response comes from.
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Name of the cache the strategy reads and writes.
    fn cache_name(&self) -> &str;

    /// Produces a response for `request`.
    ///
    /// Cancelling `signal` stops waiting for the network; cache writes that
    /// already started still complete.
    async fn handle(&self, request: Request, signal: CancellationToken) -> CacheResult<Response>;
}

/// Convenience entry points for every [`CacheStrategy`].
pub trait CacheStrategyExt: CacheStrategy {
    /// Handles a request, or a URL for a `GET` request.
    fn handle_request<R>(&self, request: R) -> impl Future<Output = CacheResult<Response>> + Send
    where
        R: IntoRequest + Send,
    {
        self.handle_request_with_signal(request, CancellationToken::new())
    }

    /// Handles a request that can be aborted through `signal`.
    fn handle_request_with_signal<R>(
        &self,
        request: R,
        signal: CancellationToken,
    ) -> impl Future<Output = CacheResult<Response>> + Send
    where
        R: IntoRequest + Send,
    {
        let request = request.into_request();
        async move { self.handle(request?, signal).await }
    }
}

impl<T: CacheStrategy + ?Sized> CacheStrategyExt for T {}

/// Manual population of a cache. Only [`CacheOnly`] provides it.
#[async_trait]
pub trait AddToCache: Send + Sync {
    /// Stores `response` for `request` and applies the expiration policy.
    async fn add_to_cache(&self, request: Request, response: Response) -> CacheResult<()>;
}

/// Any of the four strategies, chosen at runtime.
#[derive(Debug)]
pub enum Strategy {
    /// See [`CacheFirst`].
    CacheFirst(CacheFirst),
    /// See [`NetworkFirst`].
    NetworkFirst(NetworkFirst),
    /// See [`CacheOnly`].
    CacheOnly(CacheOnly),
    /// See [`StaleWhileRevalidate`].
    StaleWhileRevalidate(StaleWhileRevalidate),
}

impl Strategy {
    fn as_dyn(&self) -> &dyn CacheStrategy {
        match self {
            Strategy::CacheFirst(strategy) => strategy,
            Strategy::NetworkFirst(strategy) => strategy,
            Strategy::CacheOnly(strategy) => strategy,
            Strategy::StaleWhileRevalidate(strategy) => strategy,
        }
    }

    /// Returns the shared strategy state.
    pub fn core(&self) -> &StrategyCore {
        match self {
            Strategy::CacheFirst(strategy) => strategy.core(),
            Strategy::NetworkFirst(strategy) => strategy.core(),
            Strategy::CacheOnly(strategy) => strategy.core(),
            Strategy::StaleWhileRevalidate(strategy) => strategy.core(),
        }
    }

    /// Runs background tasks on `offload` instead of a private manager.
    pub fn with_offload(self, offload: OffloadManager) -> Self {
        match self {
            Strategy::CacheFirst(strategy) => strategy.with_offload(offload).into(),
            Strategy::NetworkFirst(strategy) => strategy.with_offload(offload).into(),
            Strategy::CacheOnly(strategy) => strategy.with_offload(offload).into(),
            Strategy::StaleWhileRevalidate(strategy) => strategy.with_offload(offload).into(),
        }
    }

    /// Returns the manual population capability, if this strategy has it.
    pub fn as_cache_only(&self) -> Option<&dyn AddToCache> {
        match self {
            Strategy::CacheOnly(strategy) => Some(strategy),
            _ => None,
        }
    }
}

#[async_trait]
impl CacheStrategy for Strategy {
    fn name(&self) -> &'static str {
        self.as_dyn().name()
    }

    fn cache_name(&self) -> &str {
        self.as_dyn().cache_name()
    }

    async fn handle(&self, request: Request, signal: CancellationToken) -> CacheResult<Response> {
        self.as_dyn().handle(request, signal).await
    }
}

macro_rules! impl_from_strategy {
    ($($variant:ident),+) => {
        $(
            impl From<$variant> for Strategy {
                fn from(strategy: $variant) -> Self {
                    Strategy::$variant(strategy)
                }
            }
        )+
    };
}

impl_from_strategy!(CacheFirst, NetworkFirst, CacheOnly, StaleWhileRevalidate);

/// Maps an aborted fetch to [`CacheError::Cancelled`] for strategies without a fallback.
pub(crate) fn caller_error(error: crate::NetworkError) -> CacheError {
    match error {
        crate::NetworkError::Aborted => CacheError::Cancelled,
        other => CacheError::Network(other),
    }
}
