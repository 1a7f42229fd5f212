//! Prefix subscription delivery semantics

use crate::common::{event_log, record_into};
use canopy::{Cache, EventKind, MergeOptions, Value};

// === Prefix matching ===

#[test]
fn test_subscriber_sees_exact_key() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("a.b", record_into(&log));

    cache.put("a.b", Value::Int(1));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].op, EventKind::Set);
    assert_eq!(log[0].key.as_deref(), Some("a.b"));
    assert_eq!(log[0].value, Some(Value::Int(1)));
}

#[test]
fn test_subscriber_sees_deeper_mutations() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("user", record_into(&log));

    cache.put("user.profile.name", Value::from("Alice"));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].key.as_deref(), Some("user.profile.name"));
}

#[test]
fn test_deep_subscriber_sees_shallow_ancestor_mutation() {
    // Subscribing at a.b.c registers under prefixes a, a.b, and a.b.c;
    // a rewrite of "a" matches the shallowest prefix.
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("a.b.c", record_into(&log));

    cache.put("a", Value::Int(1));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_sibling_path_not_notified() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("a.b", record_into(&log));

    cache.put("a.c", Value::Int(1));
    cache.put("z", Value::Int(2));

    // "a.c" matches the shared prefix "a"; "z" matches nothing
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].key.as_deref(), Some("a.c"));
}

#[test]
fn test_one_delivery_per_event_despite_multiple_matching_prefixes() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("a.b.c", record_into(&log));

    // Matches prefixes a, a.b, and a.b.c of the single subscription
    cache.put("a.b.c.d", Value::Int(1));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_independent_subscribers_each_notified() {
    let cache = Cache::ephemeral();
    let log1 = event_log();
    let log2 = event_log();
    cache.subscribe("a", record_into(&log1));
    cache.subscribe("a.b", record_into(&log2));

    cache.put("a.b.c", Value::Int(1));

    assert_eq!(log1.lock().unwrap().len(), 1);
    assert_eq!(log2.lock().unwrap().len(), 1);
}

// === Event kinds ===

#[test]
fn test_del_event_fires_even_when_nothing_existed() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("ghost", record_into(&log));

    cache.del("ghost");

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].op, EventKind::Del);
    assert_eq!(log[0].key.as_deref(), Some("ghost"));
    assert!(log[0].value.is_none());
}

#[test]
fn test_merge_event_per_imported_key() {
    let cache = Cache::ephemeral();
    let log = event_log();
    cache.subscribe("a", record_into(&log));

    cache.merge(
        vec![
            ("a".to_string(), Value::Int(1)),
            ("unrelated".to_string(), Value::Int(2)),
        ],
        MergeOptions::default(),
    );

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].op, EventKind::Merge);
    assert_eq!(log[0].key.as_deref(), Some("a"));
    assert_eq!(log[0].value, Some(Value::Int(1)));
}

#[test]
fn test_merge_skipped_duplicate_not_notified() {
    let cache = Cache::ephemeral();
    cache.put("a", Value::Int(1));

    let log = event_log();
    cache.subscribe("a", record_into(&log));
    cache.merge(
        vec![("a".to_string(), Value::Int(99))],
        MergeOptions {
            skip_duplicates: true,
        },
    );

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_clear_fires_once_per_subscriber() {
    let cache = Cache::ephemeral();
    cache.put("a", Value::Int(1));
    cache.put("b", Value::Int(2));
    cache.put("c", Value::Int(3));

    let log1 = event_log();
    let log2 = event_log();
    cache.subscribe("a", record_into(&log1));
    cache.subscribe("does.not.exist", record_into(&log2));

    cache.clear();

    // One clear event each, regardless of how many keys were dropped
    let log1 = log1.lock().unwrap();
    assert_eq!(log1.len(), 1);
    assert_eq!(log1[0].op, EventKind::Clear);
    assert!(log1[0].key.is_none());
    assert_eq!(log2.lock().unwrap().len(), 1);
}

// === Lifecycle ===

#[test]
fn test_unsubscribe_stops_delivery() {
    let cache = Cache::ephemeral();
    let log = event_log();
    let sub = cache.subscribe("a", record_into(&log));

    cache.put("a", Value::Int(1));
    sub.unsubscribe();
    cache.put("a", Value::Int(2));

    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(cache.subscriber_count(), 0);
}

#[test]
fn test_unsubscribe_twice_is_noop() {
    let cache = Cache::ephemeral();
    let sub1 = cache.subscribe("a", |_| {});
    let sub2 = cache.subscribe("a", |_| {});

    sub1.unsubscribe();
    sub1.unsubscribe();

    // The sibling subscription is unaffected
    assert_eq!(cache.subscriber_count(), 1);
    let log = event_log();
    drop(sub2);
    cache.subscribe("a", record_into(&log));
    cache.put("a", Value::Int(1));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_dropping_subscription_handle_keeps_it_live() {
    let cache = Cache::ephemeral();
    let log = event_log();
    let sub = cache.subscribe("a", record_into(&log));
    drop(sub);

    cache.put("a", Value::Int(1));
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(cache.subscriber_count(), 1);
}

// === Reentrancy ===

#[test]
fn test_callback_may_reenter_the_cache() {
    // Dispatch happens outside the mutex domain, so a callback can read
    // back the state the mutation produced.
    let cache = Cache::ephemeral();
    let observed = event_log();
    let reader = cache.clone();
    let sink = std::sync::Arc::clone(&observed);
    cache.subscribe("a", move |event| {
        assert_eq!(reader.get("a.b"), Some(Value::Int(1)));
        sink.lock().unwrap().push(event.clone());
    });

    cache.put("a.b", Value::Int(1));
    assert_eq!(observed.lock().unwrap().len(), 1);
}
