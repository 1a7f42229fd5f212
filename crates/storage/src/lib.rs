//! Storage layer for the canopy cache
//!
//! Two independent concerns live here:
//! - [`durable`]: the single-slot durable store the cache snapshots into
//! - [`expiry`]: the worker thread that fires per-root TTL deadlines
//!
//! Neither knows about the cache's data model; the engine wires them to it.

pub mod durable;
pub mod expiry;

pub use durable::{DurableStore, FileStore, MemoryStore};
pub use expiry::{ExpiredTimer, ExpiryScheduler};
