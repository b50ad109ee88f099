// src/metrics/counters.rs

//! Named atomic counters for process-wide observability.
//!
//! Counters are created on demand by name and incremented silently at the
//! call site. [`Metrics::snapshot`] returns the current values, which is how
//! both tests and log flushing read them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Registry of named counters.
///
/// Cloneable handle semantics come from wrapping in `Arc` at the call site;
/// the registry itself only hands out [`Counter`]s.
#[derive(Default)]
pub struct Metrics {
    counters: Mutex<BTreeMap<String, Arc<AtomicU64>>>,
}

/// Handle to a single named counter.
#[derive(Clone)]
pub struct Counter {
    name: String,
    value: Arc<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the counter with the given name.
    pub fn counter(&self, name: &str) -> Counter {
        let mut counters = self.counters.lock().unwrap();
        let value = counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone();

        Counter {
            name: name.to_string(),
            value,
        }
    }

    /// Read the current value of a counter, zero if it was never created.
    pub fn value(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current values of all counters.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Counter {
    /// Increment the counter by `delta`.
    pub fn inc(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
        tracing::trace!(metric = %self.name, delta, "counter incremented");
    }
}
