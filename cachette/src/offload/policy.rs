//! Limits applied to background revalidations and late writes.
//!
//! The configuration can be loaded together with the strategies:
//!
//! ```
//! use std::time::Duration;
//! use cachette::offload::{OffloadConfig, TimeoutPolicy};
//!
//! let config: OffloadConfig = serde_json::from_str(
//!     r#"{"timeout": {"policy": "warn", "after": "2s"}, "deduplicate": false}"#,
//! )
//! .unwrap();
//! assert_eq!(config.timeout, TimeoutPolicy::Warn(Duration::from_secs(2)));
//! assert!(!config.deduplicate);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to a background task that runs longer than expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "after", rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Tasks run until the network settles.
    #[default]
    None,
    /// The task is dropped after the duration and a
    /// [`NetworkError::Timeout`](crate::NetworkError::Timeout) goes to the
    /// error sink. Nothing is written to the cache.
    Cancel(#[serde(with = "humantime_serde")] Duration),
    /// A warning is logged once the task finished later than the duration.
    /// Its outcome is handled as usual.
    Warn(#[serde(with = "humantime_serde")] Duration),
}

/// Configuration for the [`OffloadManager`](super::OffloadManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Limit on how long a revalidation or late write may take.
    pub timeout: TimeoutPolicy,
    /// Skip a revalidation while one for the same request and cache is in
    /// flight.
    pub deduplicate: bool,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        OffloadConfig {
            timeout: TimeoutPolicy::None,
            deduplicate: true,
        }
    }
}

impl OffloadConfig {
    /// Starts from the defaults: no timeout, deduplication on.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Fluent builder for [`OffloadConfig`].
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    config: OffloadConfig,
}

impl OffloadConfigBuilder {
    /// Sets the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.config.timeout = policy;
        self
    }

    /// Drops tasks running longer than `duration`.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Logs tasks running longer than `duration` without stopping them.
    pub fn warn_after(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Warn(duration))
    }

    /// Enables or disables revalidation deduplication.
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.config.deduplicate = enabled;
        self
    }

    /// Returns the configuration.
    pub fn build(self) -> OffloadConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: OffloadConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OffloadConfig::default());
    }

    #[test]
    fn cancel_policy_reads_humantime() {
        let config: OffloadConfig =
            serde_json::from_str(r#"{"timeout": {"policy": "cancel", "after": "1m 30s"}}"#)
                .unwrap();
        assert_eq!(config.timeout, TimeoutPolicy::Cancel(Duration::from_secs(90)));
        assert!(config.deduplicate);
    }

    #[test]
    fn builder_sets_warn_policy() {
        let config = OffloadConfig::builder()
            .warn_after(Duration::from_millis(250))
            .deduplicate(false)
            .build();
        assert_eq!(config.timeout, TimeoutPolicy::Warn(Duration::from_millis(250)));
        assert!(!config.deduplicate);
    }
}
