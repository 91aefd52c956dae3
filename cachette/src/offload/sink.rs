//! Destinations for errors raised by background tasks.

use std::fmt::Debug;

use tracing::warn;

use super::OffloadKey;
use crate::CacheError;

/// Receives errors from background tasks that have no caller to return to.
pub trait ErrorSink: Debug + Send + Sync {
    /// Called once for every failed background task.
    fn report(&self, task: &OffloadKey, error: CacheError);
}

/// [`ErrorSink`] that logs every error at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, task: &OffloadKey, error: CacheError) {
        warn!(?task, %error, "background task failed");
    }
}
