//! Integration tests for the Stale-While-Revalidate strategy.

mod common;

use std::time::Duration;

use cachette::offload::{OffloadConfig, OffloadKey};
use cachette::{CacheError, CacheOptions, CacheStrategyExt, NetworkError};
use cachette_backend::{CacheHandle, CacheStore};
use cachette_core::Request;
use common::{Harness, url};
use tokio::time::Instant;

#[tokio::test]
async fn test_serves_cached_then_revalidated_response() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());

    let miss = strategy.handle_request(url("/api/swr")).await.unwrap();
    assert!(!miss.is_cache_hit());
    assert_eq!(miss.text(), "/api/swr #1");

    let stale = strategy.handle_request(url("/api/swr")).await.unwrap();
    assert!(stale.is_cache_hit());
    assert_eq!(stale.text(), "/api/swr #1");

    harness.offload.wait_all().await;
    let refreshed = strategy.handle_request(url("/api/swr")).await.unwrap();
    assert!(refreshed.is_cache_hit());
    assert_eq!(refreshed.text(), "/api/swr #2");
    assert!(harness.sink.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hit_does_not_wait_for_network() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());
    strategy.handle_request(url("/api/swr")).await.unwrap();

    harness.network.set_delay(Some(Duration::from_secs(60)));
    let started = Instant::now();
    let response = strategy.handle_request(url("/api/swr")).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(response.text(), "/api/swr #1");
    assert_eq!(harness.offload.active_task_count(), 1);

    harness.offload.wait_all().await;
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(harness.network.calls(), 2);
}

#[tokio::test]
async fn test_expired_entries_are_still_served() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate(
        "swr",
        CacheOptions::builder().max_age_seconds(20).build(),
    );
    strategy.handle_request(url("/api/swr")).await.unwrap();

    harness.clock.advance(Duration::from_secs(3600));
    let response = strategy.handle_request(url("/api/swr")).await.unwrap();

    assert!(response.is_cache_hit());
    assert_eq!(response.text(), "/api/swr #1");
}

#[tokio::test]
async fn test_failed_revalidation_reaches_error_sink() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());
    strategy.handle_request(url("/api/swr")).await.unwrap();

    harness.network.set_offline(true);
    let response = strategy.handle_request(url("/api/swr")).await.unwrap();
    assert_eq!(response.text(), "/api/swr #1");

    harness.offload.wait_all().await;
    let reports = harness.sink.reports();
    assert_eq!(reports.len(), 1);
    let expected_key = Request::get(&url("/api/swr")).unwrap().key();
    assert_eq!(reports[0].0, OffloadKey::request("swr", expected_key));
    assert_eq!(reports[0].1, "failed to fetch: network is offline");
}

#[tokio::test]
async fn test_offline_hits_never_mutate_the_store() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());
    strategy.handle_request(url("/api/swr")).await.unwrap();
    let cache = harness.store.open("swr").await.unwrap();
    let before = cache.entries().await.unwrap();

    harness.network.set_offline(true);
    for _ in 0..3 {
        let response = strategy.handle_request(url("/api/swr")).await.unwrap();
        assert_eq!(response.text(), "/api/swr #1");
        harness.offload.wait_all().await;
    }

    let after = cache.entries().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].stored_at(), before[0].stored_at());
    assert_eq!(harness.sink.reports().len(), 3);
}

#[tokio::test]
async fn test_miss_while_offline_fails() {
    let harness = Harness::new();
    harness.network.set_offline(true);
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());

    let error = strategy.handle_request(url("/api/swr")).await.unwrap_err();

    assert!(matches!(error, CacheError::Network(NetworkError::Fetch(_))));
    assert_eq!(harness.stored("swr").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_revalidations_are_deduplicated_per_request() {
    let harness = Harness::new();
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());
    strategy.handle_request(url("/api/swr")).await.unwrap();

    harness.network.set_delay(Some(Duration::from_secs(1)));
    for _ in 0..3 {
        strategy.handle_request(url("/api/swr")).await.unwrap();
    }
    harness.offload.wait_all().await;

    assert_eq!(harness.network.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_revalidations_run_individually_without_deduplication() {
    let harness =
        Harness::with_offload_config(OffloadConfig::builder().deduplicate(false).build());
    let strategy = harness.stale_while_revalidate("swr", CacheOptions::default());
    strategy.handle_request(url("/api/swr")).await.unwrap();

    harness.network.set_delay(Some(Duration::from_secs(1)));
    for _ in 0..3 {
        strategy.handle_request(url("/api/swr")).await.unwrap();
    }
    harness.offload.wait_all().await;

    assert_eq!(harness.network.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_shared_manager_revalidates_each_cache() {
    let harness = Harness::new();
    let first = harness.stale_while_revalidate("cache-a", CacheOptions::default());
    let second = harness.stale_while_revalidate("cache-b", CacheOptions::default());
    first.handle_request(url("/x")).await.unwrap();
    second.handle_request(url("/x")).await.unwrap();

    harness.network.set_delay(Some(Duration::from_secs(1)));
    first.handle_request(url("/x")).await.unwrap();
    second.handle_request(url("/x")).await.unwrap();
    harness.offload.wait_all().await;

    assert_eq!(harness.network.calls(), 4);
    harness.network.set_delay(None);
    harness.network.set_offline(true);
    let refreshed_a = first.handle_request(url("/x")).await.unwrap();
    let refreshed_b = second.handle_request(url("/x")).await.unwrap();
    let mut bodies = [refreshed_a.text().into_owned(), refreshed_b.text().into_owned()];
    bodies.sort();
    assert_eq!(bodies, ["/x #3", "/x #4"]);
    harness.offload.wait_all().await;
}
