//! Caches responses of a real HTTP server with `cachette-reqwest`.
//!
//! ```text
//! cargo run -p cachette-demos --example reqwest -- https://www.rust-lang.org/
//! ```

use std::sync::Arc;
use std::time::Duration;

use cachette::offload::OffloadManager;
use cachette::{CacheOptions, CacheStrategyExt, NetworkFirst, StaleWhileRevalidate};
use cachette_moka::MokaStore;
use cachette_reqwest::ReqwestFetch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter("cachette=debug,reqwest=info")
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://www.rust-lang.org/".to_owned());

    let store = Arc::new(
        MokaStore::builder()
            .max_entries(1000)
            .time_to_live(Duration::from_secs(600))
            .build(),
    );
    let client = reqwest::Client::builder()
        .user_agent("cachette-example/1.0")
        .build()?;
    let fetch = Arc::new(ReqwestFetch::new(client));

    let network_first = NetworkFirst::new(
        "pages",
        CacheOptions::builder()
            .network_timeout(Duration::from_secs(3))
            .build(),
        store.clone(),
        fetch.clone(),
    );

    println!("=== Network First ===");
    let response = network_first.handle_request(url.as_str()).await?;
    info!(status = %response.status(), bytes = response.body().len(), cache_hit = response.is_cache_hit());

    let offload = OffloadManager::default();
    let swr = StaleWhileRevalidate::new("pages", CacheOptions::default(), store, fetch)
        .with_offload(offload.clone());

    println!("=== Stale While Revalidate (served from the cache filled above) ===");
    let response = swr.handle_request(url.as_str()).await?;
    info!(status = %response.status(), bytes = response.body().len(), cache_hit = response.is_cache_hit());

    offload.wait_all().await;
    println!("=== Revalidated in the background ===");
    Ok(())
}
