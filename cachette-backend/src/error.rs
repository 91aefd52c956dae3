//! Error types for store operations.

use http::Method;
use smol_str::SmolStr;
use thiserror::Error;

/// Error type for cache store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),

    /// Only `GET` requests can be stored.
    #[error("cannot store a response for a {0} request, only GET is supported")]
    UnsupportedMethod(Method),

    /// The named cache was deleted while a handle to it was still in use.
    #[error("cache `{0}` was deleted")]
    Closed(SmolStr),
}

impl StoreError {
    /// Wraps an arbitrary error as [`StoreError::Internal`].
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Internal(error.into())
    }
}
