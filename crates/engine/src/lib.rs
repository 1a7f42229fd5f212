//! Canopy engine: the cache itself.
//!
//! Combines the key path codec and value model from `canopy-core` with the
//! durable store and TTL scheduler from `canopy-storage` into the public
//! [`Cache`] API.

pub mod cache;
mod subscription;

pub use cache::{Cache, ExpireCallback, MergeOptions, Subscription};
pub use subscription::SubscriberCallback;

pub use canopy_core::{CacheEvent, Error, EventKind, KeyPath, Result, Value};
pub use canopy_storage::durable::{DurableStore, FileStore, MemoryStore};
