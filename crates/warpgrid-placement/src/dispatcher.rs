//! Bounded fork-join fan-out over a fixed list of work items.
//!
//! Workers pull item indices from a shared atomic cursor until the list is
//! drained, so fast workers pick up the slack of slow ones. The caller is
//! blocked until every worker has joined.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::debug;

/// Runs `pieces` work items on at most `workers` threads.
#[derive(Debug, Clone, Copy)]
pub struct ParallelDispatcher {
    workers: usize,
}

impl ParallelDispatcher {
    /// `workers` is clamped to at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Call `work(i)` for every `i` in `0..pieces`.
    ///
    /// Once `stop()` returns true no new items are handed out; items
    /// already running are left to finish. Returns the number of items
    /// that were run.
    pub fn run<W, S>(&self, pieces: usize, stop: S, work: W) -> usize
    where
        W: Fn(usize) + Sync,
        S: Fn() -> bool + Sync,
    {
        if pieces == 0 {
            return 0;
        }

        let cursor = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let drain = || {
            while !stop() {
                let i = cursor.fetch_add(1, Ordering::Relaxed);
                if i >= pieces {
                    break;
                }
                work(i);
                completed.fetch_add(1, Ordering::Relaxed);
            }
        };

        let workers = self.workers.min(pieces);
        debug!(workers, pieces, "dispatching work items");

        if workers == 1 {
            drain();
        } else {
            thread::scope(|s| {
                for _ in 0..workers {
                    s.spawn(&drain);
                }
            });
        }

        completed.load(Ordering::Relaxed)
    }
}

impl Default for ParallelDispatcher {
    fn default() -> Self {
        Self::new(16)
    }
}
