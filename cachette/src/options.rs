//! Per-strategy cache options.

use std::time::Duration;

use cachette_core::MatchOptions;
use serde::{Deserialize, Serialize};

/// Options shared by all strategies.
///
/// Durations deserialize from humantime strings (`"20s"`, `"1h 30m"`) or from
/// plain numbers of seconds. The camel-case names used by browser caching
/// libraries are accepted as aliases:
///
/// ```
/// use std::time::Duration;
/// use cachette::CacheOptions;
///
/// let options: CacheOptions =
///     serde_json::from_str(r#"{"maxAgeSeconds": 20, "networkTimeoutSeconds": 3}"#).unwrap();
/// assert_eq!(options.max_age, Some(Duration::from_secs(20)));
/// assert_eq!(options.network_timeout, Some(Duration::from_secs(3)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Entries older than this are expired. `None` disables age expiration.
    #[serde(
        with = "duration",
        alias = "maxAge",
        alias = "maxAgeSeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,

    /// Upper bound on the number of entries in the named cache.
    #[serde(alias = "maxEntries", skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    /// How long Network First waits before falling back to the cache.
    #[serde(
        with = "duration",
        alias = "networkTimeout",
        alias = "networkTimeoutSeconds",
        alias = "networkTimeoutInSeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub network_timeout: Option<Duration>,

    /// How stored entries are matched against requests.
    #[serde(alias = "matchOptions")]
    pub match_options: MatchOptions,
}

impl CacheOptions {
    /// Create a new builder for CacheOptions.
    pub fn builder() -> CacheOptionsBuilder {
        CacheOptionsBuilder::default()
    }
}

/// Builder for [`CacheOptions`].
#[derive(Debug, Clone, Default)]
pub struct CacheOptionsBuilder {
    options: CacheOptions,
}

impl CacheOptionsBuilder {
    /// Set the maximum entry age.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.options.max_age = Some(max_age);
        self
    }

    /// Set the maximum entry age in seconds.
    pub fn max_age_seconds(self, seconds: u64) -> Self {
        self.max_age(Duration::from_secs(seconds))
    }

    /// Set the maximum number of entries.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.options.max_entries = Some(max_entries);
        self
    }

    /// Set the Network First timeout.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.options.network_timeout = Some(timeout);
        self
    }

    /// Set the Network First timeout in seconds.
    pub fn network_timeout_seconds(self, seconds: u64) -> Self {
        self.network_timeout(Duration::from_secs(seconds))
    }

    /// Set the match options.
    pub fn match_options(mut self, match_options: MatchOptions) -> Self {
        self.options.match_options = match_options;
        self
    }

    /// Build the CacheOptions.
    pub fn build(self) -> CacheOptions {
        self.options
    }
}

/// Optional durations as humantime strings or numbers of seconds.
mod duration {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        FractionalSeconds(f64),
        Human(String),
    }

    pub(super) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime_serde::serialize(value, serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<RawDuration>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let duration = match raw {
            RawDuration::Seconds(seconds) => Duration::from_secs(seconds),
            RawDuration::FractionalSeconds(seconds) => {
                Duration::try_from_secs_f64(seconds).map_err(D::Error::custom)?
            }
            RawDuration::Human(text) => {
                humantime_serde::re::humantime::parse_duration(&text).map_err(D::Error::custom)?
            }
        };
        Ok(Some(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humantime_and_seconds_are_equivalent() {
        let human: CacheOptions = serde_json::from_str(r#"{"max_age": "1m"}"#).unwrap();
        let seconds: CacheOptions = serde_json::from_str(r#"{"maxAgeSeconds": 60}"#).unwrap();
        assert_eq!(human, seconds);
    }

    #[test]
    fn serializes_durations_as_humantime() {
        let options = CacheOptions::builder().max_age_seconds(90).build();
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["max_age"], "1m 30s");
        assert!(json.get("network_timeout").is_none());
    }

    #[test]
    fn accepts_network_timeout_in_seconds() {
        let options: CacheOptions =
            serde_json::from_str(r#"{"networkTimeoutInSeconds": 3, "maxEntries": 10}"#).unwrap();
        assert_eq!(options.network_timeout, Some(Duration::from_secs(3)));
        assert_eq!(options.max_entries, Some(10));
    }

    #[test]
    fn rejects_garbage_durations() {
        let result = serde_json::from_str::<CacheOptions>(r#"{"max_age": "soon"}"#);
        assert!(result.is_err());
    }
}
