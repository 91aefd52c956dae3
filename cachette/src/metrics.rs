//! Metrics declaration and recording helpers.
//!
//! Every helper is a no-op unless the `metrics` feature is enabled.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Strategy outcome metrics

    /// Track number of responses served from the cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_cache_hit_total",
            "Total number of responses served from the cache."
        );
        "cachette_cache_hit_total"
    };
    /// Track number of lookups that found no usable entry.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_cache_miss_total",
            "Total number of cache lookups without a usable entry."
        );
        "cachette_cache_miss_total"
    };
    /// Track number of network fetches issued.
    pub static ref NETWORK_FETCH_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_network_fetch_total",
            "Total number of network fetches issued by strategies."
        );
        "cachette_network_fetch_total"
    };
    /// Track number of failed network fetches.
    pub static ref NETWORK_FAILURE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_network_failure_total",
            "Total number of network fetches that produced no response."
        );
        "cachette_network_failure_total"
    };

    // Store metrics

    /// Track number of entries written.
    pub static ref CACHE_WRITE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_cache_write_total",
            "Total number of entries written to named caches."
        );
        "cachette_cache_write_total"
    };
    /// Track number of entries removed by expiration.
    pub static ref CACHE_EVICTION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "cachette_cache_eviction_total",
            "Total number of entries removed by the expiration policy."
        );
        "cachette_cache_eviction_total"
    };

    // Offload manager metrics

    /// Track number of background tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "cachette_offload_tasks_spawned_total",
            "Total number of background tasks spawned."
        );
        "cachette_offload_tasks_spawned_total"
    };
    /// Track number of background tasks completed successfully.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "cachette_offload_tasks_completed_total",
            "Total number of background tasks completed successfully."
        );
        "cachette_offload_tasks_completed_total"
    };
    /// Track number of background tasks that failed or timed out.
    pub static ref OFFLOAD_TASKS_FAILED: &'static str = {
        metrics::describe_counter!(
            "cachette_offload_tasks_failed_total",
            "Total number of background tasks that failed or timed out."
        );
        "cachette_offload_tasks_failed_total"
    };
    /// Track number of background tasks skipped because one was in flight.
    pub static ref OFFLOAD_TASKS_DEDUPLICATED: &'static str = {
        metrics::describe_counter!(
            "cachette_offload_tasks_deduplicated_total",
            "Total number of background tasks skipped because the same key was in flight."
        );
        "cachette_offload_tasks_deduplicated_total"
    };
    /// Gauge of currently active background tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "cachette_offload_tasks_active",
            "Number of currently active background tasks."
        );
        "cachette_offload_tasks_active"
    };
}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_hit(strategy: &'static str, cache: &str) {
    metrics::counter!(*CACHE_HIT_COUNTER, "strategy" => strategy, "cache" => cache.to_string())
        .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_hit(_strategy: &'static str, _cache: &str) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_miss(strategy: &'static str, cache: &str) {
    metrics::counter!(*CACHE_MISS_COUNTER, "strategy" => strategy, "cache" => cache.to_string())
        .increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_miss(_strategy: &'static str, _cache: &str) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_fetch(cache: &str, succeeded: bool) {
    metrics::counter!(*NETWORK_FETCH_COUNTER, "cache" => cache.to_string()).increment(1);
    if !succeeded {
        metrics::counter!(*NETWORK_FAILURE_COUNTER, "cache" => cache.to_string()).increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_fetch(_cache: &str, _succeeded: bool) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_write(cache: &str) {
    metrics::counter!(*CACHE_WRITE_COUNTER, "cache" => cache.to_string()).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_write(_cache: &str) {}

#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_eviction(cache: &str, removed: usize) {
    metrics::counter!(*CACHE_EVICTION_COUNTER, "cache" => cache.to_string())
        .increment(removed as u64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_eviction(_cache: &str, _removed: usize) {}
