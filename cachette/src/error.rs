use std::time::Duration;

use cachette_backend::StoreError;
use cachette_core::{FetchError, InvalidRequest, RequestKey};
use thiserror::Error;

/// Why a network fetch produced no response.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The fetch adapter failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The network did not answer within the configured timeout.
    #[error("network did not respond within {0:?}")]
    Timeout(Duration),
    /// The caller aborted the request.
    #[error("network request was aborted")]
    Aborted,
    /// The task running the fetch panicked or was cancelled.
    #[error("network task failed: {0}")]
    TaskFailed(String),
}

/// Error returned by caching strategies.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The network failed and the strategy had nothing else to serve.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// No usable entry was found and the strategy never goes to the network.
    #[error("no cached response for {key}")]
    CacheMiss {
        /// Identity of the request that missed.
        key: RequestKey,
    },

    /// The network failed and the cache fallback found nothing.
    #[error("network failed and no cached response for {key}: {source}")]
    CombinedFailure {
        /// Identity of the request.
        key: RequestKey,
        /// The network failure that triggered the fallback.
        #[source]
        source: NetworkError,
    },

    /// The caller aborted the request before a response was available.
    #[error("request was cancelled")]
    Cancelled,

    /// The cache store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The input could not be turned into a request.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
}

impl CacheError {
    /// Returns `true` for [`CacheError::CacheMiss`].
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, CacheError::CacheMiss { .. })
    }

    /// Returns the network failure carried by this error, if any.
    pub fn network_error(&self) -> Option<&NetworkError> {
        match self {
            CacheError::Network(error) | CacheError::CombinedFailure { source: error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }
}

impl From<FetchError> for CacheError {
    fn from(error: FetchError) -> Self {
        CacheError::Network(NetworkError::Fetch(error))
    }
}

/// Result type for strategy operations.
pub type CacheResult<T> = Result<T, CacheError>;
