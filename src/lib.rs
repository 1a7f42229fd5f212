//! # Canopy
//!
//! In-process hierarchical key-value cache with per-entry TTL eviction,
//! path-prefix subscription notifications, and synchronous durable
//! snapshots.
//!
//! Keys are dotted paths (`"user.profile.name"`); the first segment
//! addresses a root entry and the remainder addresses into that entry's
//! value tree. Every mutation persists the full store into a pluggable
//! [`DurableStore`] and notifies subscribers registered at any prefix of
//! the mutated key.
//!
//! ## Quick start
//!
//! ```
//! use canopy::{Cache, Value};
//! use std::time::Duration;
//!
//! let cache = Cache::ephemeral();
//!
//! cache.put("user.profile.name", Value::from("Alice"));
//! assert_eq!(cache.get("user.profile.name"), Some(Value::from("Alice")));
//!
//! // A subscriber at "user" observes mutations anywhere beneath it
//! let sub = cache.subscribe("user", |event| {
//!     println!("{:?} at {:?}", event.op, event.key);
//! });
//!
//! cache.put_with_ttl("session.token", Value::from("abc123"), Duration::from_secs(60));
//!
//! sub.unsubscribe();
//! ```
//!
//! ## Durability
//!
//! ```no_run
//! use canopy::{Cache, FileStore, Value};
//! use std::sync::Arc;
//!
//! let cache = Cache::new(Arc::new(FileStore::new("/var/lib/app/cache.json")));
//! cache.load().unwrap();
//! cache.put("settings.theme", Value::from("dark"));
//! ```

pub use canopy_engine::{
    Cache, CacheEvent, DurableStore, Error, EventKind, ExpireCallback, FileStore, KeyPath,
    MemoryStore, MergeOptions, Result, SubscriberCallback, Subscription, Value,
};

// Full member crates, for callers that want the module paths
pub use canopy_core as core;
pub use canopy_engine as engine;
pub use canopy_storage as storage;
