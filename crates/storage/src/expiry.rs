//! TTL expiry scheduler
//!
//! A single worker thread parks on a condvar until the earliest armed
//! deadline, then hands each due timer to the handler installed at
//! construction. Deadlines are held in a `BTreeMap` keyed by
//! `(deadline, sequence)` so range order is firing order.
//!
//! ## Cancellation
//!
//! Arming returns a monotonically increasing *generation* token. The
//! scheduler never removes an armed deadline early; instead the handler is
//! expected to compare the fired generation against the one recorded on the
//! live entry and ignore stale wakeups. Rewriting or deleting an entry
//! therefore invalidates its timer without touching the scheduler.

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error};

/// A timer whose deadline has passed, handed to the expiry handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredTimer {
    /// The normalized key that armed the TTL
    pub key: String,
    /// Generation token returned by [`ExpiryScheduler::arm`]
    pub generation: u64,
}

/// Handler invoked off the worker thread for each due timer
pub type ExpiryHandler = Box<dyn Fn(ExpiredTimer) + Send + Sync>;

struct SchedulerState {
    deadlines: BTreeMap<(Instant, u64), ExpiredTimer>,
    sequence: u64,
    next_generation: u64,
}

struct SchedulerShared {
    state: Mutex<SchedulerState>,
    work_ready: Condvar,
    shutdown: AtomicBool,
    handler: ExpiryHandler,
}

/// One-shot deadline scheduler backing per-root TTL eviction
pub struct ExpiryScheduler {
    shared: Arc<SchedulerShared>,
    worker: Option<JoinHandle<()>>,
}

impl ExpiryScheduler {
    /// Spawn the worker thread with the given expiry handler
    pub fn new(handler: ExpiryHandler) -> Self {
        let shared = Arc::new(SchedulerShared {
            state: Mutex::new(SchedulerState {
                deadlines: BTreeMap::new(),
                sequence: 0,
                next_generation: 1,
            }),
            work_ready: Condvar::new(),
            shutdown: AtomicBool::new(false),
            handler,
        });

        let worker_shared = Arc::clone(&shared);
        let worker = match std::thread::Builder::new()
            .name("canopy-expiry".to_string())
            .spawn(move || run_worker(worker_shared))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a worker no TTL ever fires; entries simply persist.
                error!(error = %e, "failed to spawn expiry worker");
                None
            }
        };

        ExpiryScheduler { shared, worker }
    }

    /// Arm a one-shot deadline for `key`, returning its generation token.
    ///
    /// The token must be stored on the entry; the handler receives it back
    /// and skips the wakeup when the entry's recorded token has moved on.
    pub fn arm(&self, key: impl Into<String>, deadline: Instant) -> u64 {
        let mut state = self.shared.state.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        state.sequence += 1;
        let slot = (deadline, state.sequence);
        state.deadlines.insert(
            slot,
            ExpiredTimer {
                key: key.into(),
                generation,
            },
        );
        drop(state);
        self.shared.work_ready.notify_one();
        generation
    }

    /// Number of armed deadlines that have not fired yet (stale included)
    pub fn pending(&self) -> usize {
        self.shared.state.lock().deadlines.len()
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.work_ready.notify_all();
        if let Some(worker) = self.worker.take() {
            // The handler can release the owner's last strong handle, which
            // runs this drop on the worker thread itself; joining there
            // would deadlock. The shutdown flag alone stops the loop.
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run_worker(shared: Arc<SchedulerShared>) {
    loop {
        let due = {
            let mut state = shared.state.lock();
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }

                let now = Instant::now();
                let mut due = Vec::new();
                while let Some((slot, timer)) = state.deadlines.pop_first() {
                    if slot.0 <= now {
                        due.push(timer);
                    } else {
                        state.deadlines.insert(slot, timer);
                        break;
                    }
                }
                if !due.is_empty() {
                    break due;
                }

                match state.deadlines.keys().next().map(|(deadline, _)| *deadline) {
                    Some(next) => {
                        shared.work_ready.wait_until(&mut state, next);
                    }
                    None => {
                        shared.work_ready.wait(&mut state);
                    }
                }
            }
        };

        for timer in due {
            debug!(key = %timer.key, generation = timer.generation, "ttl deadline fired");
            (shared.handler)(timer);
        }
    }
}
