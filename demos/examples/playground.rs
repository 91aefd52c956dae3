//! Walks through the four caching strategies against a mocked network.
//!
//! The mocked server can be switched offline and slowed down, the caches can
//! be cleared, and entries expire after a short `max_age`, so every branch of
//! every strategy shows up in the output.
//!
//! ```text
//! RUST_LOG=cachette=debug cargo run -p cachette-demos --example playground
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use cachette::{
    AddToCache, CacheError, CacheStrategy, CacheStrategyExt, CachetteConfig, Strategy,
};
use cachette_backend::{CacheStore, MemoryStore};
use cachette_core::{Fetch, FetchError, Request, Response, fetch_fn};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Knobs of the mocked server.
#[derive(Default)]
struct MockServer {
    offline: AtomicBool,
    latency_ms: AtomicU64,
    served: AtomicU64,
}

impl MockServer {
    fn set_offline(&self, offline: bool) {
        println!("  ~ network is now {}", if offline { "offline" } else { "online" });
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn set_latency(&self, latency: Duration) {
        println!("  ~ network latency is now {latency:?}");
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }
}

fn mock_fetch(server: Arc<MockServer>) -> Arc<dyn Fetch> {
    Arc::new(fetch_fn(move |request: Request| {
        let server = server.clone();
        async move {
            let latency = server.latency_ms.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(latency)).await;
            if server.offline.load(Ordering::SeqCst) {
                return Err(FetchError::connection("failed to reach the mocked server"));
            }
            let version = server.served.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Response::new(format!(
                "{} says hello (version {version})",
                request.uri().path()
            )))
        }
    }))
}

async fn show(strategy: &Strategy, url: &str) {
    match strategy.handle_request(url).await {
        Ok(response) => {
            let source = if response.is_cache_hit() { "cache" } else { "network" };
            println!("  [{}] {source:>7}: {}", strategy.name(), response.text());
        }
        Err(CacheError::CacheMiss { key }) => {
            println!("  [{}]    miss: nothing cached for {key}", strategy.name());
        }
        Err(error) => println!("  [{}]   error: {error}", strategy.name()),
    }
}

const CONFIG: &str = r#"
offload:
  timeout:
    policy: cancel
    after: 5s
strategies:
  - type: CacheFirst
    cache_name: cache-text-demo
    options:
      max_age: 2s
  - type: NetworkFirst
    cache_name: network-text-demo
    options:
      networkTimeoutInSeconds: 0.5
      max_entries: 10
  - type: CacheOnly
    cache_name: cache-only-demo
    options:
      max_age: 2s
  - type: StaleWhileRevalidate
    cache_name: swr-text-demo
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cachette=info")),
        )
        .init();

    let server = Arc::new(MockServer::default());
    let store = MemoryStore::new();
    let config = CachetteConfig::from_yaml(CONFIG)?;
    let offload = config.offload_manager();
    let strategies = config.build_with_offload(
        Arc::new(store.clone()),
        mock_fetch(server.clone()),
        offload.clone(),
    );
    let [cache_first, network_first, cache_only, swr] = &strategies[..] else {
        return Err("the playground expects four strategies".into());
    };

    println!("\n## Cache First");
    show(cache_first, "/api/cache-first").await;
    show(cache_first, "/api/cache-first").await;
    server.set_offline(true);
    show(cache_first, "/api/cache-first").await;
    println!("  ~ waiting for the entry to expire");
    tokio::time::sleep(Duration::from_millis(2100)).await;
    show(cache_first, "/api/cache-first").await;
    server.set_offline(false);
    show(cache_first, "/api/cache-first").await;

    println!("\n## Network First");
    show(network_first, "/api/network-first").await;
    server.set_latency(Duration::from_secs(1));
    show(network_first, "/api/network-first").await;
    show(network_first, "/api/never-cached").await;
    offload.wait_all().await;
    server.set_latency(Duration::ZERO);
    server.set_offline(true);
    show(network_first, "/api/network-first").await;

    let signal = CancellationToken::new();
    signal.cancel();
    if let Err(error) = network_first
        .handle_request_with_signal("/api/aborted", signal)
        .await
    {
        println!("  [{}] aborted: {error}", network_first.name());
    }
    server.set_offline(false);

    println!("\n## Cache Only");
    show(cache_only, "/api/cache-only").await;
    if let Some(cache_only) = cache_only.as_cache_only() {
        cache_only
            .add_to_cache(
                Request::get("/api/cache-only")?,
                Response::new("stored by hand, no server involved"),
            )
            .await?;
    }
    show(cache_only, "/api/cache-only").await;
    tokio::time::sleep(Duration::from_millis(2100)).await;
    show(cache_only, "/api/cache-only").await;

    println!("\n## Stale While Revalidate");
    show(swr, "/api/swr").await;
    show(swr, "/api/swr").await;
    offload.wait_all().await;
    show(swr, "/api/swr").await;
    server.set_offline(true);
    show(swr, "/api/swr").await;
    offload.wait_all().await;
    server.set_offline(false);

    println!("\n## Clearing caches");
    for name in store.names().await? {
        store.delete(&name).await?;
        println!("  ~ cleared {name}");
    }
    show(cache_first, "/api/cache-first").await;
    show(swr, "/api/swr").await;
    offload.wait_all().await;

    println!("\nThe mocked server answered {} requests.", server.served.load(Ordering::SeqCst));
    Ok(())
}
