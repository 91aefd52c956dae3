#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod fetch;

pub use fetch::ReqwestFetch;

/// Re-export of the URL type accepted by [`ReqwestFetch::with_base_url`].
pub use reqwest::Url;
