#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod builder;
mod store;

pub use builder::{EntryCapacity, MokaStoreBuilder, NoCapacity, Unbounded};
pub use moka::policy::EvictionPolicy;
pub use store::{MokaCache, MokaStore};
