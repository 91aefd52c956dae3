//! OffloadManager implementation for background task execution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cachette_core::RequestKey;
use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, info_span, warn};

use super::policy::{OffloadConfig, TimeoutPolicy};
use super::sink::{ErrorSink, TracingErrorSink};
use crate::error::{CacheError, CacheResult, NetworkError};

#[cfg(feature = "metrics")]
use crate::metrics::{
    OFFLOAD_TASKS_ACTIVE, OFFLOAD_TASKS_COMPLETED, OFFLOAD_TASKS_DEDUPLICATED,
    OFFLOAD_TASKS_FAILED, OFFLOAD_TASKS_SPAWNED,
};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Key for identifying background tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OffloadKey {
    /// Task refreshing one request in one named cache (enables
    /// deduplication).
    Request {
        /// Named cache the refreshed entry is written to.
        cache: SmolStr,
        /// Identity of the refreshed request.
        key: RequestKey,
    },
    /// Auto-generated key for other tasks, with a kind prefix.
    Generated {
        /// Kind of the task (e.g. "late-network-write").
        kind: SmolStr,
        /// Unique identifier within the manager.
        id: u64,
    },
}

impl OffloadKey {
    /// Key for refreshing `key` in the cache called `cache`.
    pub fn request(cache: impl Into<SmolStr>, key: RequestKey) -> Self {
        Self::Request {
            cache: cache.into(),
            key,
        }
    }

    /// Returns the key type used for metrics labels and spans.
    pub fn key_type(&self) -> SmolStr {
        match self {
            Self::Request { .. } => SmolStr::new_static("request"),
            Self::Generated { kind, .. } => kind.clone(),
        }
    }
}

impl fmt::Display for OffloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { cache, key } => write!(f, "{key} in {cache}"),
            Self::Generated { kind, id } => write!(f, "{kind}#{id}"),
        }
    }
}

/// Handle to a spawned background task.
#[derive(Debug)]
pub struct OffloadHandle {
    handle: JoinHandle<()>,
    id: u64,
}

impl OffloadHandle {
    /// Check if the task is finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
struct OffloadManagerInner {
    config: OffloadConfig,
    tasks: DashMap<OffloadKey, OffloadHandle>,
    key_counter: AtomicU64,
    task_counter: AtomicU64,
    sink: Arc<dyn ErrorSink>,
    finished: Notify,
}

/// Runs background work (revalidations, late network writes) on tokio.
///
/// Every task returns a [`CacheResult`]; failures go to the configured
/// [`ErrorSink`] instead of disappearing. Clones share the same task set.
#[derive(Clone, Debug)]
pub struct OffloadManager {
    inner: Arc<OffloadManagerInner>,
}

impl OffloadManager {
    /// Create a new OffloadManager reporting errors through `tracing`.
    pub fn new(config: OffloadConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingErrorSink))
    }

    /// Create a new OffloadManager reporting errors to `sink`.
    pub fn with_sink(config: OffloadConfig, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            inner: Arc::new(OffloadManagerInner {
                config,
                tasks: DashMap::new(),
                key_counter: AtomicU64::new(0),
                task_counter: AtomicU64::new(0),
                sink,
                finished: Notify::new(),
            }),
        }
    }

    /// Create a new OffloadManager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(OffloadConfig::default())
    }

    fn next_key(&self, kind: impl Into<SmolStr>) -> OffloadKey {
        let id = self.inner.key_counter.fetch_add(1, Ordering::Relaxed);
        OffloadKey::Generated {
            kind: kind.into(),
            id,
        }
    }

    /// Spawn a task with an auto-generated key of the given kind.
    pub fn spawn<F>(&self, kind: impl Into<SmolStr>, task: F) -> OffloadKey
    where
        F: Future<Output = CacheResult<()>> + Send + 'static,
    {
        let key = self.next_key(kind);
        self.spawn_with_key(key.clone(), task);
        key
    }

    /// Spawn a task with a specific key.
    ///
    /// If deduplication is enabled and a task for the same request and cache
    /// is still running, the new task is dropped.
    ///
    /// Returns `true` if the task was spawned, `false` if it was deduplicated.
    pub fn spawn_with_key<K, F>(&self, key: K, task: F) -> bool
    where
        K: Into<OffloadKey>,
        F: Future<Output = CacheResult<()>> + Send + 'static,
    {
        let mut key = key.into();

        if matches!(&key, OffloadKey::Request { .. }) && self.is_in_flight(&key) {
            if self.inner.config.deduplicate {
                debug!(%key, "task deduplicated, already in flight");
                #[cfg(feature = "metrics")]
                metrics::counter!(*OFFLOAD_TASKS_DEDUPLICATED, "key_type" => key.key_type().to_string())
                    .increment(1);
                return false;
            }
            key = self.next_key(key.key_type());
        }

        #[cfg(feature = "metrics")]
        {
            let key_type = key.key_type().to_string();
            metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "key_type" => key_type.clone()).increment(1);
            metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "key_type" => key_type).increment(1.0);
        }

        let id = self.inner.task_counter.fetch_add(1, Ordering::Relaxed);
        let (registered, gate) = oneshot::channel();
        let handle = self.spawn_inner(task, key.clone(), id, gate);
        self.inner.tasks.insert(key, handle);
        // The task starts only once its handle is tracked.
        let _ = registered.send(());
        true
    }

    /// Get the number of currently active tasks.
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.iter().filter(|e| !e.is_finished()).count()
    }

    /// Clean up finished task handles.
    pub fn cleanup_finished(&self) {
        self.inner.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Cancel all running tasks.
    pub fn cancel_all(&self) {
        for entry in self.inner.tasks.iter() {
            entry.abort();
        }
    }

    /// Cancel a specific task by key.
    pub fn cancel(&self, key: &OffloadKey) -> bool {
        if let Some(entry) = self.inner.tasks.get(key) {
            entry.abort();
            true
        } else {
            false
        }
    }

    /// Check if a task with the given key is in flight.
    pub fn is_in_flight(&self, key: &OffloadKey) -> bool {
        self.inner.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    /// Wait for all currently tracked tasks to complete.
    ///
    /// Tasks spawned by the awaited tasks are waited for as well.
    pub async fn wait_all(&self) {
        loop {
            let notified = self.inner.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.cleanup_finished();
            if self.inner.tasks.is_empty() {
                break;
            }

            // Aborted tasks never notify, so poll as well.
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(WAIT_POLL_INTERVAL) => {}
            }
        }
    }

    /// Wait for all tasks with a timeout.
    ///
    /// Returns `true` if all tasks completed within the timeout,
    /// `false` if the timeout was reached.
    pub async fn wait_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_all()).await.is_ok()
    }

    fn spawn_inner<F>(
        &self,
        task: F,
        key: OffloadKey,
        id: u64,
        gate: oneshot::Receiver<()>,
    ) -> OffloadHandle
    where
        F: Future<Output = CacheResult<()>> + Send + 'static,
    {
        let timeout_policy = self.inner.config.timeout;
        let inner = self.inner.clone();
        let key_type = key.key_type();

        let span = info_span!(
            "offload_task",
            key_type = %key_type,
            key = %key,
        );

        let handle = tokio::spawn(
            async move {
                let _ = gate.await;
                let start = Instant::now();
                let result = match timeout_policy {
                    TimeoutPolicy::None => task.await,
                    TimeoutPolicy::Cancel(duration) => {
                        match tokio::time::timeout(duration, task).await {
                            Ok(result) => result,
                            Err(_) => {
                                warn!(%key, "offload task cancelled due to timeout");
                                Err(CacheError::Network(NetworkError::Timeout(duration)))
                            }
                        }
                    }
                    TimeoutPolicy::Warn(duration) => {
                        let result = task.await;
                        let elapsed = start.elapsed();
                        if elapsed > duration {
                            warn!(
                                %key,
                                elapsed_ms = elapsed.as_millis(),
                                threshold_ms = duration.as_millis(),
                                "offload task exceeded timeout threshold"
                            );
                        }
                        result
                    }
                };

                let succeeded = result.is_ok();
                if let Err(error) = result {
                    inner.sink.report(&key, error);
                } else {
                    debug!(elapsed_ms = start.elapsed().as_millis(), "offload task completed");
                }
                inner.tasks.remove_if(&key, |_, handle| handle.id == id);
                inner.finished.notify_waiters();
                Self::record_completion(&key_type, succeeded);
            }
            .instrument(span),
        );

        OffloadHandle { handle, id }
    }

    #[cfg(feature = "metrics")]
    fn record_completion(key_type: &SmolStr, succeeded: bool) {
        let counter = if succeeded {
            *OFFLOAD_TASKS_COMPLETED
        } else {
            *OFFLOAD_TASKS_FAILED
        };
        metrics::counter!(counter, "key_type" => key_type.to_string()).increment(1);
        metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "key_type" => key_type.to_string()).decrement(1.0);
    }

    #[cfg(not(feature = "metrics"))]
    fn record_completion(_key_type: &SmolStr, _succeeded: bool) {}
}

impl Default for OffloadManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
