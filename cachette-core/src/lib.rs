#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod clock;
pub mod entry;
pub mod fetch;
pub mod key;
pub mod matching;
pub mod request;
pub mod response;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
pub use entry::CacheEntry;
pub use fetch::{Fetch, FetchError, FnFetch, fetch_fn};
pub use key::RequestKey;
pub use matching::MatchOptions;
pub use request::{IntoRequest, InvalidRequest, Request};
pub use response::{CACHE_HIT_HEADER, Response};
#[doc(hidden)]
pub use smol_str::SmolStr;
