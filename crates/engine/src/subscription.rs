//! Prefix subscription index
//!
//! A subscriber registered at `a.b` is notified for mutations at `a.b` and
//! anywhere beneath it, because subscribing registers the id under every
//! ancestor prefix of the key. Lookup walks the mutated key's prefixes and
//! deduplicates, so a subscriber matched through several prefixes is
//! invoked exactly once per event.
//!
//! ## Invariants
//!
//! - A prefix entry exists only while at least one live subscription was
//!   registered at exactly that prefix; entries prune when their last
//!   subscriber leaves. Lookups tolerate empty sets regardless.
//! - Removal is idempotent: removing an unknown id is a no-op.

use canopy_core::{CacheEvent, KeyPath};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked with each matched event
pub type SubscriberCallback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// id→callback mapping plus the prefix→id-set index
#[derive(Default)]
pub(crate) struct SubscriptionIndex {
    callbacks: HashMap<Uuid, SubscriberCallback>,
    prefixes: HashMap<String, HashSet<Uuid>>,
}

impl SubscriptionIndex {
    /// Register `callback` under every given prefix
    pub(crate) fn insert(&mut self, id: Uuid, prefixes: &[String], callback: SubscriberCallback) {
        self.callbacks.insert(id, callback);
        for prefix in prefixes {
            self.prefixes.entry(prefix.clone()).or_default().insert(id);
        }
    }

    /// Remove `id` from every given prefix, pruning empty entries
    pub(crate) fn remove(&mut self, id: Uuid, prefixes: &[String]) {
        self.callbacks.remove(&id);
        for prefix in prefixes {
            if let Some(ids) = self.prefixes.get_mut(prefix) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.prefixes.remove(prefix);
                }
            }
        }
    }

    /// Dedup'd callbacks of every subscriber whose prefix matches `path`
    pub(crate) fn subscribers_for(&self, path: &KeyPath) -> Vec<SubscriberCallback> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for prefix in path.prefixes() {
            if let Some(ids) = self.prefixes.get(&prefix) {
                for id in ids {
                    if seen.insert(*id) {
                        if let Some(callback) = self.callbacks.get(id) {
                            matched.push(Arc::clone(callback));
                        }
                    }
                }
            }
        }
        matched
    }

    /// Every registered callback, once each (used by `clear`)
    pub(crate) fn all(&self) -> Vec<SubscriberCallback> {
        self.callbacks.values().map(Arc::clone).collect()
    }

    /// Number of live subscriptions
    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[cfg(test)]
    fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }
}
