//! Per-thread filter that avoids re-validating SQL fired twice in quick
//! succession by layered interceptors wrapping the same call.
//!
//! Each thread owns a private [`BoundedHashMap`]; there is no cross-thread
//! access and no synchronisation, so the filter is always safe to share —
//! it never touches anything but thread-local storage.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::common::BoundedHashMap;
use crate::result::ValidationResult;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_TTL_MS: u64 = 100;

struct DedupEntry {
    inserted_at: Instant,
    result: Option<ValidationResult>,
}

thread_local! {
    static STATE: RefCell<BoundedHashMap<String, DedupEntry>> =
        RefCell::new(BoundedHashMap::new(DEFAULT_CAPACITY));
}

#[derive(Debug, Clone, Copy)]
pub struct DeduplicationFilter {
    capacity: usize,
    ttl: Duration,
}

impl Default for DeduplicationFilter {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
        }
    }
}

impl DeduplicationFilter {
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: Duration::from_millis(ttl_ms),
        }
    }

    /// True if `key` (already normalised by the caller) has not been seen on
    /// this thread within the freshness window. Either way, reserves the
    /// slot with a pending marker so the entry exists for [`Self::record`].
    pub fn should_check(&self, key: &str) -> bool {
        STATE.with(|state| {
            let mut state = state.borrow_mut();
            if state.capacity() != self.capacity {
                *state = BoundedHashMap::new(self.capacity);
            }
            if let Some(entry) = state.get_no_update(&key.to_string()) {
                if entry.inserted_at.elapsed() < self.ttl {
                    return false;
                }
            }
            state.insert(
                key.to_string(),
                DedupEntry {
                    inserted_at: Instant::now(),
                    result: None,
                },
            );
            true
        })
    }

    /// Stores `result` against `key`, refreshing its timestamp so the
    /// freshness window restarts from the moment the result became known.
    pub fn record(&self, key: &str, result: ValidationResult) {
        STATE.with(|state| {
            state.borrow_mut().insert(
                key.to_string(),
                DedupEntry {
                    inserted_at: Instant::now(),
                    result: Some(result),
                },
            );
        });
    }

    /// The result recorded for `key` on this thread, if it is still inside
    /// the freshness window. Used by the validator entry point to answer a
    /// repeat call in O(1) instead of re-running the checker catalog.
    pub fn cached_result(&self, key: &str) -> Option<ValidationResult> {
        STATE.with(|state| {
            let state = state.borrow();
            state.get_no_update(&key.to_string()).and_then(|entry| {
                if entry.inserted_at.elapsed() < self.ttl {
                    entry.result.clone()
                } else {
                    None
                }
            })
        })
    }

    /// Called by the host at the end of a task/request to drop this
    /// thread's dedup state.
    pub fn clear_thread_state() {
        STATE.with(|state| state.borrow_mut().clear());
    }
}
