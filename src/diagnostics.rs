//! Per-worker counters, merged pointwise once all workers join. Follows the
//! teacher's `Arc<AtomicUsize>` progress-counter pattern (`cli/pipeline.rs`)
//! but widened to `AtomicU64` since these counters are read only after
//! join, never polled mid-run for progress display.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live, per-worker accumulator. One instance per spawned worker thread;
/// never shared across threads.
#[derive(Debug, Default)]
pub struct WorkerDiagnostics {
    pub seeds_emitted: AtomicU64,
    pub seeds_skipped_diagonal: AtomicU64,
    pub extensions_attempted: AtomicU64,
    pub extensions_passed_cutoff: AtomicU64,
    pub hsps_inserted: AtomicU64,
    pub hsps_trimmed: AtomicU64,
    pub subjects_scanned: AtomicU64,
    pub elapsed_nanos: AtomicU64,
}

impl WorkerDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Diagnostics {
        Diagnostics {
            seeds_emitted: self.seeds_emitted.load(Ordering::Relaxed),
            seeds_skipped_diagonal: self.seeds_skipped_diagonal.load(Ordering::Relaxed),
            extensions_attempted: self.extensions_attempted.load(Ordering::Relaxed),
            extensions_passed_cutoff: self.extensions_passed_cutoff.load(Ordering::Relaxed),
            hsps_inserted: self.hsps_inserted.load(Ordering::Relaxed),
            hsps_trimmed: self.hsps_trimmed.load(Ordering::Relaxed),
            subjects_scanned: self.subjects_scanned.load(Ordering::Relaxed),
            elapsed_nanos: self.elapsed_nanos.load(Ordering::Relaxed),
        }
    }
}

/// Merged, read-only counters exposed to callers after the preliminary
/// phase completes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub seeds_emitted: u64,
    pub seeds_skipped_diagonal: u64,
    pub extensions_attempted: u64,
    pub extensions_passed_cutoff: u64,
    pub hsps_inserted: u64,
    pub hsps_trimmed: u64,
    pub subjects_scanned: u64,
    pub elapsed_nanos: u64,
}

impl Diagnostics {
    /// Pointwise sum, happens-after all worker exits per the concurrency
    /// model (§5 of the distilled spec).
    pub fn merge(&mut self, other: &Diagnostics) {
        self.seeds_emitted += other.seeds_emitted;
        self.seeds_skipped_diagonal += other.seeds_skipped_diagonal;
        self.extensions_attempted += other.extensions_attempted;
        self.extensions_passed_cutoff += other.extensions_passed_cutoff;
        self.hsps_inserted += other.hsps_inserted;
        self.hsps_trimmed += other.hsps_trimmed;
        self.subjects_scanned += other.subjects_scanned;
        self.elapsed_nanos = self.elapsed_nanos.max(other.elapsed_nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn merge_is_pointwise_sum_except_elapsed() {
        let mut a = Diagnostics {
            seeds_emitted: 10,
            hsps_inserted: 3,
            elapsed_nanos: 100,
            ..Default::default()
        };
        let b = Diagnostics {
            seeds_emitted: 5,
            hsps_inserted: 2,
            elapsed_nanos: 250,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.seeds_emitted, 15);
        assert_eq!(a.hsps_inserted, 5);
        assert_eq!(a.elapsed_nanos, 250);
    }

    #[test]
    fn worker_snapshot_reflects_atomics() {
        let w = WorkerDiagnostics::new();
        w.seeds_emitted.fetch_add(7, Ordering::Relaxed);
        let snap = w.snapshot();
        assert_eq!(snap.seeds_emitted, 7);
    }
}
