//! Background task execution.
//!
//! Stale-while-revalidate refreshes and Network First responses that arrive
//! after the timeout are written to the cache by tasks nobody awaits. They
//! run on an [`OffloadManager`], which tracks them, optionally deduplicates
//! refreshes of the same request and hands every failure to an
//! [`ErrorSink`].
//!
//! ```
//! use std::sync::Arc;
//! use cachette::offload::{OffloadConfig, OffloadManager, TracingErrorSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = OffloadManager::with_sink(OffloadConfig::default(), Arc::new(TracingErrorSink));
//! manager.spawn("warmup", async { Ok(()) });
//! manager.wait_all().await;
//! assert_eq!(manager.active_task_count(), 0);
//! # }
//! ```

mod manager;
mod policy;
mod sink;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};
pub use sink::{ErrorSink, TracingErrorSink};
