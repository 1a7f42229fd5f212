//! Shared test helpers

use canopy::CacheEvent;
use std::sync::{Arc, Mutex};

pub type EventLog = Arc<Mutex<Vec<CacheEvent>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A subscriber callback that appends every delivered event to `log`
pub fn record_into(log: &EventLog) -> impl Fn(&CacheEvent) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |event| log.lock().unwrap().push(event.clone())
}
