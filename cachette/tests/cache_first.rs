//! Integration tests for the Cache First strategy.

mod common;

use std::time::Duration;

use cachette::{CacheError, CacheOptions, CacheStrategy, CacheStrategyExt, NetworkError};
use cachette_backend::{CacheHandle, CacheStore};
use cachette_core::{FetchError, Request};
use common::{Harness, url};
use http::StatusCode;
use tokio_util::sync::CancellationToken;

fn twenty_seconds() -> CacheOptions {
    CacheOptions::builder().max_age_seconds(20).build()
}

#[tokio::test]
async fn test_miss_then_hit() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", twenty_seconds());

    let first = strategy.handle_request(url("/api/cache-first")).await.unwrap();
    assert!(!first.is_cache_hit());
    assert_eq!(first.text(), "/api/cache-first #1");
    assert_eq!(harness.network.calls(), 1);
    assert_eq!(harness.stored("cache-first").await, 1);

    let second = strategy.handle_request(url("/api/cache-first")).await.unwrap();
    assert!(second.is_cache_hit());
    assert_eq!(second.headers().get("x-cache-hit").unwrap(), "true");
    assert_eq!(second.text(), "/api/cache-first #1");
    assert_eq!(harness.network.calls(), 1, "a fresh hit must not fetch");
}

#[tokio::test]
async fn test_entry_expires_after_max_age() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", twenty_seconds());
    strategy.handle_request(url("/api/a")).await.unwrap();

    harness.clock.advance(Duration::from_millis(19_999));
    let hit = strategy.handle_request(url("/api/a")).await.unwrap();
    assert!(hit.is_cache_hit());
    assert_eq!(harness.network.calls(), 1);

    harness.clock.advance(Duration::from_millis(2));
    let refreshed = strategy.handle_request(url("/api/a")).await.unwrap();
    assert!(!refreshed.is_cache_hit());
    assert_eq!(refreshed.text(), "/api/a #2");
    assert_eq!(harness.network.calls(), 2);
}

#[tokio::test]
async fn test_expired_entry_is_not_served_when_offline() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", twenty_seconds());
    strategy.handle_request(url("/api/a")).await.unwrap();

    harness.clock.advance(Duration::from_secs(21));
    harness.network.set_offline(true);

    let error = strategy.handle_request(url("/api/a")).await.unwrap_err();
    assert!(matches!(
        error,
        CacheError::Network(NetworkError::Fetch(FetchError::Connection(_)))
    ));
}

#[tokio::test]
async fn test_offline_with_fresh_cache_is_idempotent() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", twenty_seconds());
    strategy.handle_request(url("/api/a")).await.unwrap();
    let before = harness
        .store
        .open("cache-first")
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();

    harness.network.set_offline(true);
    for _ in 0..3 {
        let response = strategy.handle_request(url("/api/a")).await.unwrap();
        assert!(response.is_cache_hit());
        assert_eq!(response.text(), "/api/a #1");
    }

    let after = harness
        .store
        .open("cache-first")
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    assert_eq!(after.len(), before.len());
    assert_eq!(after[0].stored_at(), before[0].stored_at());
    assert_eq!(harness.network.calls(), 1);
}

#[tokio::test]
async fn test_error_statuses_are_returned_but_not_stored() {
    let harness = Harness::new();
    harness.network.set_status(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let strategy = harness.cache_first("cache-first", CacheOptions::default());

    let response = strategy.handle_request(url("/api/broken")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.stored("cache-first").await, 0);

    strategy.handle_request(url("/api/broken")).await.unwrap();
    assert_eq!(harness.network.calls(), 2);
}

#[tokio::test]
async fn test_non_get_requests_bypass_the_cache_write() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", CacheOptions::default());
    let post = Request::new(http::Method::POST, url("/api/form").parse().unwrap());

    let response = strategy.handle_request(post).await.unwrap();
    assert!(!response.is_cache_hit());
    assert_eq!(harness.stored("cache-first").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_abort_while_fetching_is_cancelled() {
    let harness = Harness::new();
    harness.network.set_delay(Some(Duration::from_secs(5)));
    let strategy = harness.cache_first("cache-first", CacheOptions::default());

    let signal = CancellationToken::new();
    signal.cancel();
    let error = strategy
        .handle_request_with_signal(url("/api/slow"), signal)
        .await
        .unwrap_err();

    assert!(matches!(error, CacheError::Cancelled));
    assert_eq!(harness.stored("cache-first").await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_misses_each_fetch() {
    let harness = Harness::new();
    harness.network.set_delay(Some(Duration::from_millis(100)));
    let strategy = harness.cache_first("cache-first", CacheOptions::default());

    let (first, second) = futures::join!(
        strategy.handle_request(url("/api/race")),
        strategy.handle_request(url("/api/race")),
    );
    let bodies = [
        first.unwrap().text().into_owned(),
        second.unwrap().text().into_owned(),
    ];

    assert_eq!(harness.network.calls(), 2);
    assert!(bodies.contains(&"/api/race #1".to_owned()));
    assert!(bodies.contains(&"/api/race #2".to_owned()));

    let entries = harness
        .store
        .open("cache-first")
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(bodies.contains(&entries[0].response().text().into_owned()));
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let harness = Harness::new();
    let strategy = harness.cache_first("cache-first", CacheOptions::default());

    let error = strategy.handle_request("http://exa mple.com/").await.unwrap_err();
    assert!(matches!(error, CacheError::InvalidRequest(_)));
    assert_eq!(strategy.name(), "cache-first");
    assert_eq!(harness.network.calls(), 0);
}
