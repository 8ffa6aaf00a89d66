//! Offline caching layer for the app shell, datasets and assets.
//!
//! This module provides a cache-first interception layer that:
//! - Precaches a fixed manifest into a versioned static bucket on install
//! - Evicts buckets from other versions on activation
//! - Serves cached responses without touching the network
//! - Stores successful network responses in the static or dynamic bucket
//! - Falls back to the cached shell page or a synthetic 503 when offline

mod http;
mod messages;
mod network;
mod policy;
mod registration;
mod runtime;
mod storage;
#[cfg(test)]
pub(crate) mod testing;
mod worker;

pub use http::{Destination, Response};
pub use messages::ControlMessage;
pub use network::HttpNetwork;
pub use policy::CacheNames;
pub use registration::register;
pub use runtime::{WorkerHandle, WorkerRuntime};
pub use storage::{BucketStorage, MemoryBuckets, NoopBuckets, SqliteBuckets};
pub use worker::{OfflineCache, WorkerSettings};
