//! Comprehensive cache integration tests
//!
//! Exercises the public `canopy` API end to end: hierarchical reads and
//! writes, prefix subscriptions, TTL eviction, and durable snapshots.

mod common;
mod persistence;
mod subscriptions;
