//! Subscriber event records
//!
//! Every mutation notifies matched subscribers with one [`CacheEvent`],
//! passed by reference. `key` and `value` are populated per operation:
//! `set` and `merge` carry both, `del` and `expire` carry the key only,
//! `clear` carries neither.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A value was written
    Set,
    /// A key was deleted (fires even when nothing existed)
    Del,
    /// A TTL fired and evicted a root entry
    Expire,
    /// A root key was imported by a bulk merge
    Merge,
    /// The whole store was dropped
    Clear,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Set => "set",
            EventKind::Del => "del",
            EventKind::Expire => "expire",
            EventKind::Merge => "merge",
            EventKind::Clear => "clear",
        };
        write!(f, "{name}")
    }
}

/// The record delivered to each matched subscriber callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEvent {
    /// Which mutation occurred
    pub op: EventKind,
    /// The normalized key the mutation addressed, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// The written value, for `set` and `merge`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl CacheEvent {
    /// Event for a `put`/`set` mutation
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        CacheEvent {
            op: EventKind::Set,
            key: Some(key.into()),
            value: Some(value),
        }
    }

    /// Event for a `del` mutation
    pub fn del(key: impl Into<String>) -> Self {
        CacheEvent {
            op: EventKind::Del,
            key: Some(key.into()),
            value: None,
        }
    }

    /// Event for a TTL eviction
    pub fn expire(key: impl Into<String>) -> Self {
        CacheEvent {
            op: EventKind::Expire,
            key: Some(key.into()),
            value: None,
        }
    }

    /// Event for one root key imported by `merge`
    pub fn merge(key: impl Into<String>, value: Value) -> Self {
        CacheEvent {
            op: EventKind::Merge,
            key: Some(key.into()),
            value: Some(value),
        }
    }

    /// Event for `clear`
    pub fn clear() -> Self {
        CacheEvent {
            op: EventKind::Clear,
            key: None,
            value: None,
        }
    }
}
