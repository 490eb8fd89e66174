use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub observations: Arc<AtomicU64>,
    pub changes: Arc<AtomicU64>,

    // stored history could not be trusted
    pub reinitialized: Arc<AtomicU64>,
    pub rejected: Arc<AtomicU64>,

    // pruning outcomes
    pub pruned_promoted: Arc<AtomicU64>,
    pub pruned_synthesized: Arc<AtomicU64>,

    pub retired: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub observations: u64,
    pub changes: u64,
    pub reinitialized: u64,
    pub rejected: u64,
    pub pruned_promoted: u64,
    pub pruned_synthesized: u64,
    pub retired: u64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let read = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        CountersSnapshot {
            observations: read(&self.observations),
            changes: read(&self.changes),
            reinitialized: read(&self.reinitialized),
            rejected: read(&self.rejected),
            pruned_promoted: read(&self.pruned_promoted),
            pruned_synthesized: read(&self.pruned_synthesized),
            retired: read(&self.retired),
        }
    }
}
