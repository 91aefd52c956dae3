//! Integration tests for the Network First strategy.
//!
//! Timeout races run on tokio's paused clock, so `T - ε` and `T + ε` are exact.

mod common;

use std::time::Duration;

use cachette::offload::OffloadKey;
use cachette::{CacheError, CacheOptions, CacheStrategyExt, NetworkError};
use cachette_backend::{CacheHandle, CacheStore};
use common::{Harness, url};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(3);
const EPSILON: Duration = Duration::from_millis(1);

fn with_timeout() -> CacheOptions {
    CacheOptions::builder()
        .network_timeout(TIMEOUT)
        .max_age_seconds(20)
        .build()
}

async fn stored_body(harness: &Harness, cache_name: &str) -> String {
    let entries = harness
        .store
        .open(cache_name)
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    entries[0].response().text().into_owned()
}

#[tokio::test]
async fn test_network_response_is_stored_and_returned() {
    let harness = Harness::new();
    let strategy = harness.network_first("network-first", with_timeout());

    let first = strategy.handle_request(url("/api/text")).await.unwrap();
    let second = strategy.handle_request(url("/api/text")).await.unwrap();

    assert!(!first.is_cache_hit());
    assert!(!second.is_cache_hit());
    assert_eq!(second.text(), "/api/text #2");
    assert_eq!(stored_body(&harness, "network-first").await, "/api/text #2");
}

#[tokio::test(start_paused = true)]
async fn test_network_just_before_timeout_wins() {
    let harness = Harness::new();
    let strategy = harness.network_first("network-first", with_timeout());
    strategy.handle_request(url("/api/text")).await.unwrap();

    harness.network.set_delay(Some(TIMEOUT - EPSILON));
    let response = strategy.handle_request(url("/api/text")).await.unwrap();

    assert!(!response.is_cache_hit());
    assert_eq!(response.text(), "/api/text #2");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_serves_cache_and_stores_late_response() {
    let harness = Harness::new();
    let strategy = harness.network_first("network-first", with_timeout());
    strategy.handle_request(url("/api/text")).await.unwrap();

    harness.network.set_delay(Some(TIMEOUT + EPSILON));
    let response = strategy.handle_request(url("/api/text")).await.unwrap();

    assert!(response.is_cache_hit());
    assert_eq!(response.text(), "/api/text #1");

    harness.offload.wait_all().await;
    assert_eq!(stored_body(&harness, "network-first").await, "/api/text #2");
    assert!(harness.sink.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_cache_is_combined_failure() {
    let harness = Harness::new();
    harness.network.set_delay(Some(TIMEOUT + EPSILON));
    let strategy = harness.network_first("network-first", with_timeout());

    let error = strategy.handle_request(url("/api/text")).await.unwrap_err();
    match &error {
        CacheError::CombinedFailure { key, source } => {
            assert_eq!(key.url(), "https://example.com/api/text");
            assert!(matches!(source, NetworkError::Timeout(timeout) if *timeout == TIMEOUT));
        }
        other => panic!("expected CombinedFailure, got {other:?}"),
    }

    // The fetch that lost the race still fills the cache.
    harness.offload.wait_all().await;
    assert_eq!(stored_body(&harness, "network-first").await, "/api/text #1");
}

#[tokio::test(start_paused = true)]
async fn test_late_failure_reaches_error_sink() {
    let harness = Harness::new();
    harness.network.set_delay(Some(TIMEOUT + EPSILON));
    harness.network.set_offline(true);
    let strategy = harness.network_first("network-first", with_timeout());

    let error = strategy.handle_request(url("/api/text")).await.unwrap_err();
    assert!(matches!(error, CacheError::CombinedFailure { .. }));

    harness.offload.wait_all().await;
    let reports = harness.sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(matches!(
        &reports[0].0,
        OffloadKey::Generated { kind, .. } if kind == "late-network-write"
    ));
    assert_eq!(reports[0].1, "failed to fetch: network is offline");
}

#[tokio::test]
async fn test_offline_serves_expired_entry() {
    let harness = Harness::new();
    let strategy = harness.network_first("network-first", with_timeout());
    strategy.handle_request(url("/api/text")).await.unwrap();

    harness.clock.advance(Duration::from_secs(3600));
    harness.network.set_offline(true);
    let response = strategy.handle_request(url("/api/text")).await.unwrap();

    assert!(response.is_cache_hit());
    assert_eq!(response.text(), "/api/text #1");
}

#[tokio::test]
async fn test_offline_without_cache_is_combined_failure() {
    let harness = Harness::new();
    harness.network.set_offline(true);
    let strategy = harness.network_first("network-first", with_timeout());

    let error = strategy.handle_request(url("/api/text")).await.unwrap_err();
    assert!(matches!(
        error.network_error(),
        Some(NetworkError::Fetch(_))
    ));
    assert_eq!(
        error.to_string(),
        "network failed and no cached response for GET https://example.com/api/text: \
         failed to fetch: network is offline"
    );
}

#[tokio::test(start_paused = true)]
async fn test_abort_falls_back_to_cache() {
    let harness = Harness::new();
    let strategy = harness.network_first("network-first", CacheOptions::default());
    strategy.handle_request(url("/api/text")).await.unwrap();

    harness.network.set_delay(Some(Duration::from_secs(60)));
    let signal = CancellationToken::new();
    let pending = strategy.handle_request_with_signal(url("/api/text"), signal.clone());
    let aborter = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        signal.cancel();
    };
    let (response, ()) = tokio::join!(pending, aborter);

    let response = response.unwrap();
    assert!(response.is_cache_hit());
    assert_eq!(response.text(), "/api/text #1");
}

#[tokio::test(start_paused = true)]
async fn test_abort_without_cache_reports_aborted() {
    let harness = Harness::new();
    harness.network.set_delay(Some(Duration::from_secs(60)));
    let strategy = harness.network_first("network-first", CacheOptions::default());

    let signal = CancellationToken::new();
    signal.cancel();
    let error = strategy
        .handle_request_with_signal(url("/api/text"), signal)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CacheError::CombinedFailure {
            source: NetworkError::Aborted,
            ..
        }
    ));
    harness.offload.wait_all().await;
    assert_eq!(harness.offload.active_task_count(), 0);
}
