//! Shared per-origin request counter

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Counts requests received by each mock origin.
///
/// All origins share one lock. Cloning yields another handle to the same
/// counters, so the fleet and the scenario runner observe the same state.
#[derive(Debug, Clone, Default)]
pub struct RequestLedger {
    counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request for `origin`, returning its new count
    pub fn record(&self, origin: &str) -> u64 {
        let mut counts = self.counts.lock();
        let entry = counts.entry(origin.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Requests recorded for `origin` since the last reset
    pub fn count(&self, origin: &str) -> u64 {
        self.counts.lock().get(origin).copied().unwrap_or(0)
    }

    /// Total across every origin
    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }

    /// Sorted copy of every non-empty entry
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts
            .lock()
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }

    /// Counts for the given origins, including those never hit
    pub fn counts_for<'a>(&self, origins: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, u64> {
        let counts = self.counts.lock();
        origins
            .into_iter()
            .map(|name| (name.to_string(), counts.get(name).copied().unwrap_or(0)))
            .collect()
    }

    /// Forget every count. Only called between scenarios.
    pub fn reset(&self) {
        self.counts.lock().clear();
        tracing::debug!("Request ledger reset");
    }
}
