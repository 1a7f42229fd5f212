//! The cache engine
//!
//! [`Cache`] ties the pieces together: a root-keyed backing store, the
//! prefix subscription index, TTL timers, and the persistence bridge.
//!
//! ## Concurrency model
//!
//! One `RwLock` covers the backing store, the subscription index, and the
//! snapshot-and-persist step. Every mutating operation, including a TTL
//! firing, runs start-to-finish under the write lock, so eviction is
//! observably atomic with respect to concurrent `get`/`put` on the same
//! root key, and no mutation can interleave between snapshot computation
//! and the durable write. Reads take the shared lock.
//!
//! Subscriber callbacks are collected under the lock but invoked after it
//! is released, so a callback may re-enter the cache.
//!
//! ## TTL ownership
//!
//! Each root entry records the generation token of its armed timer. A
//! rewrite or delete replaces or drops the token; when a stale deadline
//! fires, the generation mismatch turns the wakeup into a no-op.

use crate::subscription::SubscriptionIndex;
use canopy_core::{CacheEvent, KeyPath, Result, Value};
use canopy_storage::durable::{DurableStore, MemoryStore};
use canopy_storage::expiry::{ExpiredTimer, ExpiryScheduler};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Callback invoked when a TTL fires, before subscribers are notified
pub type ExpireCallback = Arc<dyn Fn() + Send + Sync>;

/// Options for [`Cache::merge`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// When true, root keys that already exist are left untouched
    /// (import never overwrites). Defaults to false.
    pub skip_duplicates: bool,
}

/// One root-scoped entry: the value tree plus TTL state
struct CacheEntry {
    value: Value,
    /// Absolute expiration instant, informational only (not persisted)
    expires_at: Option<DateTime<Utc>>,
    /// Generation token of the armed timer; `None` when no TTL is live
    timer: Option<u64>,
    on_expire: Option<ExpireCallback>,
}

impl CacheEntry {
    fn plain(value: Value) -> Self {
        CacheEntry {
            value,
            expires_at: None,
            timer: None,
            on_expire: None,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: BTreeMap<String, CacheEntry>,
    subscribers: SubscriptionIndex,
    hydrated: bool,
}

struct CacheInner {
    state: RwLock<CacheState>,
    durable: Arc<dyn DurableStore>,
    expiry: ExpiryScheduler,
}

/// In-process hierarchical key-value cache.
///
/// Keys are dotted paths; the first segment addresses a root entry and the
/// remainder addresses into that entry's value tree. TTLs apply to whole
/// root entries only. Every mutation snapshots the full store into the
/// injected [`DurableStore`] and notifies prefix subscribers.
///
/// # Example
///
/// ```
/// use canopy_engine::Cache;
/// use canopy_core::Value;
///
/// let cache = Cache::ephemeral();
/// cache.put("user.profile.name", Value::from("Alice"));
/// assert_eq!(cache.get("user.profile.name"), Some(Value::from("Alice")));
/// assert!(cache.get("user").is_some_and(|v| v.is_object()));
/// ```
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

/// Handle returned by [`Cache::subscribe`]; dropping it does NOT
/// unsubscribe; calling [`unsubscribe`](Subscription::unsubscribe) is the
/// only removal path, and doing so twice is a no-op.
pub struct Subscription {
    inner: Weak<CacheInner>,
    id: Uuid,
    prefixes: Vec<String>,
}

impl Subscription {
    /// Opaque id of this subscription
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the subscription from every prefix it was registered under
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.state.write().subscribers.remove(self.id, &self.prefixes);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("prefixes", &self.prefixes)
            .finish()
    }
}

impl Cache {
    /// Create a cache persisting into the given durable store
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<CacheInner>| {
            let weak = weak.clone();
            let expiry = ExpiryScheduler::new(Box::new(move |timer| {
                if let Some(inner) = weak.upgrade() {
                    handle_expiry(&inner, timer);
                }
            }));
            CacheInner {
                state: RwLock::new(CacheState::default()),
                durable,
                expiry,
            }
        });
        Cache { inner }
    }

    /// Create a cache over an in-memory durable store
    pub fn ephemeral() -> Self {
        Cache::new(Arc::new(MemoryStore::new()))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Write `value` at `key`.
    ///
    /// A nested key merges into the root entry's value tree (starting from
    /// an empty mapping when the root is absent). Rewriting a root cancels
    /// any TTL armed on it. Persists the store and notifies matched
    /// subscribers with a `set` event.
    pub fn put(&self, key: impl Into<KeyPath>, value: impl Into<Value>) {
        self.put_internal(key.into(), value.into(), None, None);
    }

    /// Alias of [`put`](Cache::put)
    pub fn set(&self, key: impl Into<KeyPath>, value: impl Into<Value>) {
        self.put(key, value);
    }

    /// [`put`](Cache::put), arming a one-shot TTL on the root entry.
    ///
    /// When the TTL fires the root entry is evicted, subscribers receive an
    /// `expire` event for `key`, and the store is persisted. Arming
    /// replaces any prior timer for the root.
    pub fn put_with_ttl(&self, key: impl Into<KeyPath>, value: impl Into<Value>, ttl: Duration) {
        self.put_internal(key.into(), value.into(), Some(ttl), None);
    }

    /// [`put_with_ttl`](Cache::put_with_ttl) with an eviction callback,
    /// invoked before subscribers are notified of the `expire` event.
    pub fn put_with_ttl_callback(
        &self,
        key: impl Into<KeyPath>,
        value: impl Into<Value>,
        ttl: Duration,
        on_expire: impl Fn() + Send + Sync + 'static,
    ) {
        self.put_internal(key.into(), value.into(), Some(ttl), Some(Arc::new(on_expire)));
    }

    fn put_internal(
        &self,
        path: KeyPath,
        value: Value,
        ttl: Option<Duration>,
        on_expire: Option<ExpireCallback>,
    ) {
        let Some(root) = path.root().map(str::to_string) else {
            warn!("put with empty key ignored");
            return;
        };

        let (callbacks, event) = {
            let mut state = self.inner.state.write();

            let residual = path.residual();
            if residual.is_empty() {
                state.entries.insert(root.clone(), CacheEntry::plain(value.clone()));
            } else {
                let entry = state
                    .entries
                    .entry(root.clone())
                    .or_insert_with(|| CacheEntry::plain(Value::object()));
                entry.value.set_path(residual, value.clone());
                // A rewrite invalidates any timer armed on the old value
                entry.expires_at = None;
                entry.timer = None;
                entry.on_expire = None;
            }

            if let Some(ttl) = ttl {
                let generation = self
                    .inner
                    .expiry
                    .arm(path.normalize(), Instant::now() + ttl);
                let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                if let Some(entry) = state.entries.get_mut(&root) {
                    entry.expires_at = Some(Utc::now() + chrono::Duration::milliseconds(ttl_ms));
                    entry.timer = Some(generation);
                    entry.on_expire = on_expire;
                }
            }

            persist_locked(&self.inner, &state);
            (
                state.subscribers.subscribers_for(&path),
                CacheEvent::set(path.normalize(), value),
            )
        };

        for callback in &callbacks {
            callback(&event);
        }
    }

    /// Delete the value at `key`.
    ///
    /// A nested key removes only that path and preserves the root's armed
    /// TTL; a root key removes the whole entry and cancels its timer.
    /// Persists and notifies a `del` event even when nothing existed.
    pub fn del(&self, key: impl Into<KeyPath>) {
        let path = key.into();
        let Some(root) = path.root() else {
            warn!("del with empty key ignored");
            return;
        };

        let (callbacks, event) = {
            let mut state = self.inner.state.write();

            let residual = path.residual();
            if residual.is_empty() {
                // Dropping the entry drops its timer token; a pending
                // deadline fires against a missing entry and is skipped.
                state.entries.remove(root);
            } else if let Some(entry) = state.entries.get_mut(root) {
                entry.value.delete_path(residual);
            }

            persist_locked(&self.inner, &state);
            (
                state.subscribers.subscribers_for(&path),
                CacheEvent::del(path.normalize()),
            )
        };

        for callback in &callbacks {
            callback(&event);
        }
    }

    /// Drop every root entry and cancel every timer.
    ///
    /// Persists an empty store and fires exactly one `clear` event per
    /// currently-registered subscriber, regardless of how many keys
    /// existed.
    pub fn clear(&self) {
        let callbacks = {
            let mut state = self.inner.state.write();
            state.entries.clear();
            persist_locked(&self.inner, &state);
            state.subscribers.all()
        };

        let event = CacheEvent::clear();
        for callback in &callbacks {
            callback(&event);
        }
    }

    /// Bulk-set multiple root keys in one pass.
    ///
    /// A value carrying a numeric `expire` field is reinterpreted: the
    /// field is a relative millisecond offset from now, rewritten to an
    /// absolute epoch-millisecond instant before storage, and a TTL is
    /// armed for the offset. With `skip_duplicates` set, existing root
    /// keys are left untouched. Matched subscribers are notified once per
    /// imported key with a `merge` event; the store is persisted once
    /// after the pass. Returns the number of keys imported.
    pub fn merge(
        &self,
        values: impl IntoIterator<Item = (String, Value)>,
        options: MergeOptions,
    ) -> usize {
        let mut batch = Vec::new();
        let imported = {
            let mut state = self.inner.state.write();
            let mut imported = 0;

            for (root, mut value) in values {
                if root.is_empty() {
                    continue;
                }
                if options.skip_duplicates && state.entries.contains_key(&root) {
                    continue;
                }

                let mut entry = CacheEntry::plain(Value::Null);
                if let Value::Object(map) = &mut value {
                    let relative_ms = map.get("expire").and_then(|v| match v {
                        Value::Int(ms) => Some(*ms),
                        Value::Float(ms) => Some(*ms as i64),
                        _ => None,
                    });
                    if let Some(relative_ms) = relative_ms {
                        let absolute_ms = Utc::now().timestamp_millis() + relative_ms;
                        map.insert("expire".to_string(), Value::Int(absolute_ms));

                        let delay = Duration::from_millis(relative_ms.max(0) as u64);
                        let generation =
                            self.inner.expiry.arm(root.clone(), Instant::now() + delay);
                        entry.expires_at =
                            Some(Utc::now() + chrono::Duration::milliseconds(relative_ms));
                        entry.timer = Some(generation);
                    }
                }
                entry.value = value.clone();
                state.entries.insert(root.clone(), entry);
                imported += 1;

                let path = KeyPath::from(root.as_str());
                batch.push((
                    state.subscribers.subscribers_for(&path),
                    CacheEvent::merge(root, value),
                ));
            }

            persist_locked(&self.inner, &state);
            imported
        };

        for (callbacks, event) in &batch {
            for callback in callbacks {
                callback(event);
            }
        }
        imported
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read the value at `key`.
    ///
    /// An empty key returns the full root snapshot as an `Object`. Nested
    /// reads through non-mapping values fail soft and return `None`.
    pub fn get(&self, key: impl Into<KeyPath>) -> Option<Value> {
        let path = key.into();
        let state = self.inner.state.read();
        if path.is_empty() {
            return Some(snapshot_locked(&state));
        }
        let entry = state.entries.get(path.root()?)?;
        if path.residual().is_empty() {
            Some(entry.value.clone())
        } else {
            entry.value.get_path(path.residual()).cloned()
        }
    }

    /// [`get`](Cache::get) with a caller-supplied default
    pub fn get_or(&self, key: impl Into<KeyPath>, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Full snapshot of all live root entries as an `Object`
    pub fn snapshot(&self) -> Value {
        snapshot_locked(&self.inner.state.read())
    }

    /// All live root keys
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.read().entries.keys().cloned().collect()
    }

    /// Number of live root entries
    pub fn len(&self) -> usize {
        self.inner.state.read().entries.len()
    }

    /// True when no root entry is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate in-memory footprint: serialized size of the snapshot
    pub fn memory_bytes(&self) -> usize {
        self.snapshot().approximate_size()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.read().subscribers.len()
    }

    /// Absolute expiration instant of the root entry owning `key`, when a
    /// TTL is armed
    pub fn expires_at(&self, key: impl Into<KeyPath>) -> Option<DateTime<Utc>> {
        let path = key.into();
        let state = self.inner.state.read();
        state.entries.get(path.root()?)?.expires_at
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register `callback` for mutations at `key` and anywhere beneath it.
    ///
    /// The callback is registered under every prefix of the key and is
    /// invoked at most once per event even when several prefixes match.
    pub fn subscribe(
        &self,
        key: impl Into<KeyPath>,
        callback: impl Fn(&CacheEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let path = key.into();
        let id = Uuid::new_v4();
        let prefixes = path.prefixes();

        self.inner
            .state
            .write()
            .subscribers
            .insert(id, &prefixes, Arc::new(callback));

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
            prefixes,
        }
    }

    // ========================================================================
    // Hydration
    // ========================================================================

    /// Hydrate the cache from the durable record, exactly once.
    ///
    /// An absent or malformed record hydrates an empty store. Each root
    /// entry replays as a `set` (subscribers registered before `load` see
    /// the replay). Subsequent calls are no-ops.
    pub fn load(&self) -> Result<()> {
        let mut batch = Vec::new();
        {
            let mut state = self.inner.state.write();
            if state.hydrated {
                return Ok(());
            }

            let record = self
                .inner
                .durable
                .read_record()?
                .unwrap_or_else(|| "{}".to_string());
            let roots: HashMap<String, Value> = match serde_json::from_str(&record) {
                Ok(roots) => roots,
                Err(e) => {
                    warn!(error = %e, "durable record malformed, hydrating empty");
                    HashMap::new()
                }
            };

            debug!(roots = roots.len(), "hydrating cache from durable record");
            for (root, value) in roots {
                let path = KeyPath::from(root.as_str());
                batch.push((
                    state.subscribers.subscribers_for(&path),
                    CacheEvent::set(root.clone(), value.clone()),
                ));
                state.entries.insert(root, CacheEntry::plain(value));
            }
            state.hydrated = true;
            persist_locked(&self.inner, &state);
        }

        for (callbacks, event) in &batch {
            for callback in callbacks {
                callback(event);
            }
        }
        Ok(())
    }
}

/// TTL firing: an independent atomic step under the same write lock as
/// every other mutation. The generation check makes stale deadlines
/// harmless.
fn handle_expiry(inner: &Arc<CacheInner>, timer: ExpiredTimer) {
    let path = KeyPath::from(timer.key.as_str());
    let Some(root) = path.root().map(str::to_string) else {
        return;
    };

    let (on_expire, callbacks, event) = {
        let mut state = inner.state.write();
        let Some(entry) = state.entries.get(&root) else {
            return;
        };
        if entry.timer != Some(timer.generation) {
            // Root was rewritten or re-armed since this deadline was set
            return;
        }

        let on_expire = entry.on_expire.clone();
        state.entries.remove(&root);
        persist_locked(inner, &state);
        (
            on_expire,
            state.subscribers.subscribers_for(&path),
            CacheEvent::expire(timer.key),
        )
    };

    if let Some(on_expire) = on_expire {
        on_expire();
    }
    for callback in &callbacks {
        callback(&event);
    }
}

fn snapshot_locked(state: &CacheState) -> Value {
    Value::Object(
        state
            .entries
            .iter()
            .map(|(root, entry)| (root.clone(), entry.value.clone()))
            .collect(),
    )
}

/// Serialize the full root-key→value mapping and write it to the durable
/// slot. Runs inside the write lock; failures are logged, never surfaced.
fn persist_locked(inner: &CacheInner, state: &CacheState) {
    let snapshot: BTreeMap<&String, &Value> = state
        .entries
        .iter()
        .map(|(root, entry)| (root, &entry.value))
        .collect();
    match serde_json::to_string(&snapshot) {
        Ok(record) => {
            if let Err(e) = inner.durable.write_record(&record) {
                warn!(error = %e, "failed to persist cache snapshot");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize cache snapshot"),
    }
}
