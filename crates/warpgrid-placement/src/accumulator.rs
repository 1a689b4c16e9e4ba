//! Per-node raw score accumulation shared by scoring workers.
//!
//! The set of counters is fixed at construction, so workers only ever
//! touch atomics and never contend on a map lock. The first error seen by
//! any worker is kept behind a mutex; later ones are dropped.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use tracing::warn;
use warpgrid_state::Node;

use crate::error::PlacementError;

/// Raw signed scores for a fixed set of nodes plus the first error.
#[derive(Debug)]
pub struct PriorityAccumulator {
    /// Node name → index into `counts`.
    index: HashMap<String, usize>,
    counts: Vec<AtomicI64>,
    failed: AtomicBool,
    first_error: Mutex<Option<PlacementError>>,
}

impl PriorityAccumulator {
    /// Create zeroed counters for `nodes`.
    pub fn new(nodes: &[Node]) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let next = index.len();
            index.entry(node.name.clone()).or_insert(next);
        }
        let counts = (0..index.len()).map(|_| AtomicI64::new(0)).collect();

        Self {
            index,
            counts,
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
        }
    }

    /// Add `delta` to the node's counter. Nodes without a counter are ignored.
    pub fn add(&self, node_name: &str, delta: i64) {
        if let Some(&i) = self.index.get(node_name) {
            self.counts[i].fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Record `err` if no error has been recorded yet.
    pub fn set_error(&self, err: PlacementError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            warn!(error = %err, "scoring pass failed");
            *slot = Some(err);
            self.failed.store(true, Ordering::Release);
        }
    }

    /// Whether an error has been recorded. Lock-free.
    pub fn has_error(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Current raw value for a node, `None` if it has no counter.
    pub fn get(&self, node_name: &str) -> Option<i64> {
        self.index
            .get(node_name)
            .map(|&i| self.counts[i].load(Ordering::Relaxed))
    }

    /// Smallest and largest raw value. `(0, 0)` when there are no counters.
    ///
    /// Only meaningful once every worker has joined.
    pub fn min_max(&self) -> (i64, i64) {
        let mut values = self.counts.iter().map(|c| c.load(Ordering::Relaxed));
        let Some(first) = values.next() else {
            return (0, 0);
        };
        values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)))
    }

    /// Take the recorded error, if any.
    pub fn take_error(&self) -> Option<PlacementError> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}
