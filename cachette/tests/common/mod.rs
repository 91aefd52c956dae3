//! Shared fixtures: a scriptable network, a collecting error sink and a
//! harness wiring strategies to a memory store and a manual clock.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cachette::offload::{ErrorSink, OffloadConfig, OffloadKey, OffloadManager};
use cachette::{
    CacheError, CacheFirst, CacheOnly, CacheOptions, NetworkFirst, StaleWhileRevalidate,
};
use cachette_backend::{CacheHandle, CacheStore, MemoryStore};
use cachette_core::{Fetch, FetchError, ManualClock, Request, Response};
use http::StatusCode;

/// Network double that counts calls and answers `"<path> #<call>"`.
#[derive(Debug, Default)]
pub struct MockNetwork {
    calls: AtomicUsize,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    status: Mutex<Option<StatusCode>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every following response by `delay` of tokio time.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Answers every following request with `status`.
    pub fn set_status(&self, status: Option<StatusCode>) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl Fetch for MockNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::connection("network is offline"));
        }
        let body = format!("{} #{call}", request.uri().path());
        let status = self.status.lock().unwrap().unwrap_or(StatusCode::OK);
        Ok(Response::with_status(status, body))
    }
}

/// Error sink that keeps every report.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(OffloadKey, String)>>,
}

impl CollectingSink {
    pub fn reports(&self) -> Vec<(OffloadKey, String)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports().into_iter().map(|(_, message)| message).collect()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, task: &OffloadKey, error: CacheError) {
        self.reports
            .lock()
            .unwrap()
            .push((task.clone(), error.to_string()));
    }
}

/// Everything a strategy under test talks to.
pub struct Harness {
    pub store: MemoryStore,
    pub network: Arc<MockNetwork>,
    pub clock: ManualClock,
    pub sink: Arc<CollectingSink>,
    pub offload: OffloadManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_offload_config(OffloadConfig::default())
    }

    pub fn with_offload_config(config: OffloadConfig) -> Self {
        let sink = Arc::new(CollectingSink::default());
        Harness {
            store: MemoryStore::new(),
            network: MockNetwork::new(),
            clock: ManualClock::default(),
            offload: OffloadManager::with_sink(config, sink.clone()),
            sink,
        }
    }

    fn parts(&self) -> (Arc<dyn CacheStore>, Arc<dyn Fetch>) {
        let store: Arc<dyn CacheStore> = Arc::new(self.store.clone());
        let fetch: Arc<dyn Fetch> = self.network.clone();
        (store, fetch)
    }

    pub fn cache_first(&self, cache_name: &str, options: CacheOptions) -> CacheFirst {
        let (store, fetch) = self.parts();
        CacheFirst::new(cache_name, options, store, fetch)
            .with_clock(Arc::new(self.clock.clone()))
            .with_offload(self.offload.clone())
    }

    pub fn network_first(&self, cache_name: &str, options: CacheOptions) -> NetworkFirst {
        let (store, fetch) = self.parts();
        NetworkFirst::new(cache_name, options, store, fetch)
            .with_clock(Arc::new(self.clock.clone()))
            .with_offload(self.offload.clone())
    }

    pub fn cache_only(&self, cache_name: &str, options: CacheOptions) -> CacheOnly {
        let (store, fetch) = self.parts();
        CacheOnly::new(cache_name, options, store, fetch)
            .with_clock(Arc::new(self.clock.clone()))
            .with_offload(self.offload.clone())
    }

    pub fn stale_while_revalidate(
        &self,
        cache_name: &str,
        options: CacheOptions,
    ) -> StaleWhileRevalidate {
        let (store, fetch) = self.parts();
        StaleWhileRevalidate::new(cache_name, options, store, fetch)
            .with_clock(Arc::new(self.clock.clone()))
            .with_offload(self.offload.clone())
    }

    /// Number of entries currently stored under `cache_name`.
    pub async fn stored(&self, cache_name: &str) -> usize {
        self.store.open(cache_name).await.unwrap().keys().await.unwrap().len()
    }
}

pub fn url(path: &str) -> String {
    format!("https://example.com{path}")
}
