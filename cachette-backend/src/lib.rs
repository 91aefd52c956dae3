#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod error;
pub mod memory;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{CacheHandle, CacheStore, StoreResult};
