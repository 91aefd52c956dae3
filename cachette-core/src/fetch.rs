//! Network adapter abstraction.
//!
//! Strategies never talk to the network directly. They call a [`Fetch`]
//! implementation, which performs one request and returns its response.
//! HTTP error statuses are ordinary responses; only transport-level failures
//! are reported as [`FetchError`].
//!
//! Closures can act as adapters through [`fetch_fn`]:
//!
//! ```
//! use cachette_core::{Fetch, Request, Response, fetch_fn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let fetch = fetch_fn(|request: Request| async move {
//!     Ok(Response::new(format!("hello from {}", request.uri().path())))
//! });
//!
//! let response = fetch.fetch(Request::get("/greeting").unwrap()).await.unwrap();
//! assert_eq!(response.text(), "hello from /greeting");
//! # }
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

use crate::request::Request;
use crate::response::Response;

/// Failure reported by a [`Fetch`] adapter.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be delivered (offline, DNS, reset connection).
    #[error("failed to fetch: {0}")]
    Connection(#[source] Box<dyn StdError + Send + Sync>),
    /// The adapter rejected a response by status.
    #[error("unexpected response status {0}")]
    Status(StatusCode),
    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Wraps a transport error.
    pub fn connection<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        FetchError::Connection(error.into())
    }
}

/// Performs network requests on behalf of strategies.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Sends `request` and returns the response.
    async fn fetch(&self, request: Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<T> Fetch for Arc<T>
where
    T: Fetch + ?Sized,
{
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        self.as_ref().fetch(request).await
    }
}

#[async_trait]
impl<T> Fetch for Box<T>
where
    T: Fetch + ?Sized,
{
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        self.as_ref().fetch(request).await
    }
}

/// [`Fetch`] adapter wrapping a closure. Created by [`fetch_fn`].
#[derive(Clone)]
pub struct FnFetch<F> {
    f: F,
}

impl<F> fmt::Debug for FnFetch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetch").finish_non_exhaustive()
    }
}

/// Creates a [`Fetch`] adapter from an async closure.
pub fn fetch_fn<F, Fut>(f: F) -> FnFetch<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, FetchError>> + Send,
{
    FnFetch { f }
}

#[async_trait]
impl<F, Fut> Fetch for FnFetch<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, FetchError>> + Send,
{
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        (self.f)(request).await
    }
}
