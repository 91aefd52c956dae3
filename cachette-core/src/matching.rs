//! Rules for matching incoming requests against stored entries.
//!
//! Matching follows the Cache Storage semantics:
//!
//! 1. A request whose method is not `GET` never matches unless
//!    [`ignore_method`](MatchOptions::ignore_method) is set.
//! 2. Normalized URLs must be equal; with
//!    [`ignore_search`](MatchOptions::ignore_search) the query string is
//!    left out of the comparison.
//! 3. Unless [`ignore_vary`](MatchOptions::ignore_vary) is set, every header
//!    named by the stored response's `Vary` header must carry the same values
//!    in the stored and the incoming request. `Vary: *` never matches.

use http::Method;
use http::header::VARY;
use serde::{Deserialize, Serialize};

use crate::entry::CacheEntry;
use crate::key::RequestKey;
use crate::request::Request;

/// How strictly a request must match a stored entry.
///
/// The default is strict matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Ignore the query string when comparing URLs.
    #[serde(alias = "ignoreSearch")]
    pub ignore_search: bool,
    /// Match requests of any method.
    #[serde(alias = "ignoreMethod")]
    pub ignore_method: bool,
    /// Ignore the stored response's `Vary` header.
    #[serde(alias = "ignoreVary")]
    pub ignore_vary: bool,
}

impl MatchOptions {
    /// Returns strict matching options.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Sets [`ignore_search`](Self::ignore_search).
    pub fn ignore_search(self, ignore: bool) -> Self {
        Self {
            ignore_search: ignore,
            ..self
        }
    }

    /// Sets [`ignore_method`](Self::ignore_method).
    pub fn ignore_method(self, ignore: bool) -> Self {
        Self {
            ignore_method: ignore,
            ..self
        }
    }

    /// Sets [`ignore_vary`](Self::ignore_vary).
    pub fn ignore_vary(self, ignore: bool) -> Self {
        Self {
            ignore_vary: ignore,
            ..self
        }
    }

    /// Returns `true` when stores can look the entry up by key directly
    /// instead of scanning.
    pub fn is_exact(&self) -> bool {
        !self.ignore_search && !self.ignore_method
    }

    /// Checks whether `stored` answers the incoming request.
    ///
    /// `incoming_key` must be `incoming.key()`; it is passed separately so
    /// stores scanning many entries compute it once.
    pub fn matches(&self, stored: &CacheEntry, incoming: &Request, incoming_key: &RequestKey) -> bool {
        if !self.ignore_method && incoming.method() != Method::GET {
            return false;
        }

        let same_url = if self.ignore_search {
            stored.key().url_without_search() == incoming_key.url_without_search()
        } else {
            stored.key().url() == incoming_key.url()
        };

        same_url && (self.ignore_vary || vary_matches(stored, incoming))
    }
}

fn vary_matches(stored: &CacheEntry, incoming: &Request) -> bool {
    for value in stored.response().headers().get_all(VARY) {
        let Ok(value) = value.to_str() else {
            return false;
        };
        for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            if name == "*" {
                return false;
            }
            let name = name.to_ascii_lowercase();
            let stored_values = stored.request().headers().get_all(name.as_str());
            let incoming_values = incoming.headers().get_all(name.as_str());
            if stored_values.iter().ne(incoming_values.iter()) {
                return false;
            }
        }
    }
    true
}
