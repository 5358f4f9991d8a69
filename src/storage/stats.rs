use std::sync::atomic::{AtomicU64, Ordering};

/// Block-level I/O counters for one or more storage files.
///
/// Each storage file holds an `Arc<IoStats>`; hand the same handle to several
/// files to aggregate them. Counters only move forward until [`IoStats::reset`].
#[derive(Debug, Default)]
pub struct IoStats {
    /// Pages read from a data file.
    pub page_reads: AtomicU64,
    /// Pages written to a data file.
    pub page_writes: AtomicU64,
    /// Directory files read.
    pub directory_reads: AtomicU64,
    /// Directory files written.
    pub directory_writes: AtomicU64,
}

/// Plain copy of [`IoStats`] at one point in time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IoStatsSnapshot {
    /// Pages read from a data file.
    pub page_reads: u64,
    /// Pages written to a data file.
    pub page_writes: u64,
    /// Directory files read.
    pub directory_reads: u64,
    /// Directory files written.
    pub directory_writes: u64,
}

impl IoStatsSnapshot {
    /// Page plus directory reads.
    pub fn reads(&self) -> u64 {
        self.page_reads + self.directory_reads
    }

    /// Page plus directory writes.
    pub fn writes(&self) -> u64 {
        self.page_writes + self.directory_writes
    }
}

impl IoStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page_read(&self) {
        self.page_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn page_written(&self) {
        self.page_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn directory_read(&self) {
        self.directory_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn directory_written(&self) {
        self.directory_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> IoStatsSnapshot {
        IoStatsSnapshot {
            page_reads: self.page_reads.load(Ordering::Relaxed),
            page_writes: self.page_writes.load(Ordering::Relaxed),
            directory_reads: self.directory_reads.load(Ordering::Relaxed),
            directory_writes: self.directory_writes.load(Ordering::Relaxed),
        }
    }

    /// Zeroes all counters.
    pub fn reset(&self) {
        self.page_reads.store(0, Ordering::Relaxed);
        self.page_writes.store(0, Ordering::Relaxed);
        self.directory_reads.store(0, Ordering::Relaxed);
        self.directory_writes.store(0, Ordering::Relaxed);
    }
}
