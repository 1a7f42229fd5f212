//! Durable snapshot writing and hydration

use crate::common::{event_log, record_into};
use canopy::{Cache, EventKind, FileStore, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn file_cache(dir: &TempDir) -> Cache {
    Cache::new(Arc::new(FileStore::new(dir.path().join("cache.json"))))
}

// === Snapshot writing ===

#[test]
fn test_mutations_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("user.name", Value::from("Alice"));
        cache.put("count", Value::Int(3));
    }

    let reopened = file_cache(&dir);
    reopened.load().unwrap();
    assert_eq!(reopened.get("user.name"), Some(Value::from("Alice")));
    assert_eq!(reopened.get("count"), Some(Value::Int(3)));
}

#[test]
fn test_del_and_clear_persist() {
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("a", Value::Int(1));
        cache.put("b", Value::Int(2));
        cache.del("a");
    }
    {
        let reopened = file_cache(&dir);
        reopened.load().unwrap();
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b"), Some(Value::Int(2)));
        reopened.clear();
    }

    let reopened = file_cache(&dir);
    reopened.load().unwrap();
    assert!(reopened.is_empty());
}

#[test]
fn test_snapshot_is_plain_json_object() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    cache.put("a.b", Value::Int(1));

    let raw = std::fs::read_to_string(dir.path().join("cache.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["a"]["b"], serde_json::json!(1));
}

#[test]
fn test_eviction_persists() {
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("keep", Value::Int(1));
        cache.put_with_ttl("gone", Value::Int(2), Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(300));
    }

    let reopened = file_cache(&dir);
    reopened.load().unwrap();
    assert_eq!(reopened.get("keep"), Some(Value::Int(1)));
    assert_eq!(reopened.get("gone"), None);
}

#[test]
fn test_ttl_state_is_not_persisted() {
    // Only values round-trip; a reopened cache holds the entry with no
    // timer armed.
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put_with_ttl("k", Value::Int(1), Duration::from_secs(60));
    }

    let reopened = file_cache(&dir);
    reopened.load().unwrap();
    assert_eq!(reopened.get("k"), Some(Value::Int(1)));
    assert!(reopened.expires_at("k").is_none());
}

// === Hydration ===

#[test]
fn test_load_replays_set_events() {
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("a", Value::Int(1));
    }

    let reopened = file_cache(&dir);
    let log = event_log();
    reopened.subscribe("a", record_into(&log));
    reopened.load().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].op, EventKind::Set);
    assert_eq!(log[0].key.as_deref(), Some("a"));
    assert_eq!(log[0].value, Some(Value::Int(1)));
}

#[test]
fn test_load_is_idempotent() {
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("a", Value::Int(1));
    }

    let cache = file_cache(&dir);
    cache.load().unwrap();
    cache.put("a", Value::Int(2));

    // A second load must not re-hydrate over live state
    cache.load().unwrap();
    assert_eq!(cache.get("a"), Some(Value::Int(2)));
}

#[test]
fn test_load_with_absent_record_hydrates_empty() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    cache.load().unwrap();
    assert!(cache.is_empty());
}

#[test]
fn test_load_with_malformed_record_hydrates_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cache.json"), "{not json at all").unwrap();

    let cache = file_cache(&dir);
    cache.load().unwrap();
    assert!(cache.is_empty());

    // The cache stays usable and overwrites the bad record
    cache.put("a", Value::Int(1));
    let raw = std::fs::read_to_string(dir.path().join("cache.json")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}

#[test]
fn test_mutation_before_load_overwrites_the_record() {
    // Every mutation persists immediately, so writing before hydrating
    // replaces whatever the slot held.
    let dir = TempDir::new().unwrap();
    {
        let cache = file_cache(&dir);
        cache.put("disk", Value::Int(1));
    }

    let cache = file_cache(&dir);
    cache.put("early", Value::Int(2));
    cache.load().unwrap();

    assert_eq!(cache.get("early"), Some(Value::Int(2)));
    assert_eq!(cache.get("disk"), None);
}
