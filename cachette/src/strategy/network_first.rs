use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachette_backend::CacheStore;
use cachette_core::{Fetch, Request, Response};
use smol_str::SmolStr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CacheStrategy, StrategyCore, strategy_builders};
use crate::error::{CacheError, CacheResult, NetworkError};
use crate::{CacheOptions, metrics};

type FetchTask = JoinHandle<Result<Response, NetworkError>>;

enum Race {
    Network(Result<Response, NetworkError>),
    TimedOut(Duration),
    Aborted,
}

/// Prefers the network and falls back to the cache.
///
/// The fetch races `network_timeout`. When the network answers in time its
/// response is stored and returned. On timeout or network failure any stored
/// entry is served regardless of age; with nothing stored the call fails with
/// [`CacheError::CombinedFailure`].
///
/// A fetch that loses the race keeps running in the background. If it
/// succeeds its response is stored, so the next call benefits from it; if it
/// fails the error goes to the offload manager's error sink.
#[derive(Debug)]
pub struct NetworkFirst {
    core: StrategyCore,
}

impl NetworkFirst {
    /// Creates a Network First strategy writing to `cache_name`.
    pub fn new(
        cache_name: impl Into<SmolStr>,
        options: CacheOptions,
        store: Arc<dyn CacheStore>,
        fetch: Arc<dyn Fetch>,
    ) -> Self {
        NetworkFirst {
            core: StrategyCore::new(cache_name, options, store, fetch),
        }
    }

    async fn race(&self, task: &mut FetchTask, signal: &CancellationToken) -> Race {
        let timeout = self.core.options().network_timeout;
        let timer = async move {
            match timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            joined = task => Race::Network(
                joined.unwrap_or_else(|error| Err(NetworkError::TaskFailed(error.to_string()))),
            ),
            timeout = timer => Race::TimedOut(timeout),
            _ = signal.cancelled() => Race::Aborted,
        }
    }

    /// Keeps a fetch that lost the race running and stores its response.
    fn finish_in_background(&self, request: Request, task: FetchTask) {
        let core = self.core.clone();
        self.core.offload().spawn("late-network-write", async move {
            let response = match task.await {
                Ok(result) => result?,
                Err(error) => return Err(NetworkError::TaskFailed(error.to_string()).into()),
            };
            core.cache_write(&request, response).await?;
            Ok::<(), CacheError>(())
        });
    }

    async fn fall_back(&self, request: &Request, error: NetworkError) -> CacheResult<Response> {
        let key = request.key();
        let cached = match self.core.lookup(request).await {
            Ok(cached) => cached,
            Err(lookup_error) => {
                warn!(%key, error = %lookup_error, "cache fallback failed");
                None
            }
        };

        match cached {
            Some(entry) => {
                debug!(%key, %error, "network failed, serving cached response");
                metrics::record_hit(self.name(), self.cache_name());
                Ok(entry.into_response().mark_cache_hit())
            }
            None => {
                metrics::record_miss(self.name(), self.cache_name());
                Err(CacheError::CombinedFailure { key, source: error })
            }
        }
    }
}

strategy_builders!(NetworkFirst);

#[async_trait]
impl CacheStrategy for NetworkFirst {
    fn name(&self) -> &'static str {
        "network-first"
    }

    fn cache_name(&self) -> &str {
        self.core.cache_name()
    }

    async fn handle(&self, request: Request, signal: CancellationToken) -> CacheResult<Response> {
        let core = self.core.clone();
        let outgoing = request.clone();
        let mut task: FetchTask = tokio::spawn(async move { core.fetch(outgoing).await });

        let error = match self.race(&mut task, &signal).await {
            Race::Network(Ok(response)) => {
                self.core
                    .cache_write_logged(&request, response.duplicate())
                    .await;
                return Ok(response);
            }
            Race::Network(Err(error)) => error,
            Race::TimedOut(timeout) => {
                debug!(key = %request.key(), ?timeout, "network timed out");
                let error = NetworkError::Timeout(timeout);
                self.core.fetch_failed(&request, &error).await;
                self.finish_in_background(request.clone(), task);
                error
            }
            Race::Aborted => {
                task.abort();
                NetworkError::Aborted
            }
        };

        self.fall_back(&request, error).await
    }
}
