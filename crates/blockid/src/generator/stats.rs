use portable_atomic::{AtomicU64, Ordering};

/// Per-instance counters describing how a generator talks to its store.
///
/// All updates use relaxed ordering: the counters are diagnostics and never
/// drive generation decisions.
#[derive(Debug, Default)]
pub struct GeneratorStats {
    store_reads: AtomicU64,
    write_attempts: AtomicU64,
    write_conflicts: AtomicU64,
    batches_acquired: AtomicU64,
    ids_issued: AtomicU64,
}

/// A point-in-time copy of [`GeneratorStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls to the store's `read`.
    pub store_reads: u64,
    /// Calls to the store's conditional write.
    pub write_attempts: u64,
    /// Conditional writes that lost to another writer.
    pub write_conflicts: u64,
    /// Conditional writes that committed a new batch.
    pub batches_acquired: u64,
    /// Ids returned to callers.
    pub ids_issued: u64,
}

impl StatsSnapshot {
    /// Total store round trips.
    pub const fn round_trips(&self) -> u64 {
        self.store_reads + self.write_attempts
    }
}

impl GeneratorStats {
    /// Reads every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            store_reads: self.store_reads.load(Ordering::Relaxed),
            write_attempts: self.write_attempts.load(Ordering::Relaxed),
            write_conflicts: self.write_conflicts.load(Ordering::Relaxed),
            batches_acquired: self.batches_acquired.load(Ordering::Relaxed),
            ids_issued: self.ids_issued.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_read(&self) {
        self.store_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.write_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.write_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self) {
        self.batches_acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_issued(&self) {
        self.ids_issued.fetch_add(1, Ordering::Relaxed);
    }
}
