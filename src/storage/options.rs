use std::sync::Arc;

use crate::storage::stats::IoStats;

/// Settings applied when opening a heap or sorted file.
#[derive(Clone, Debug)]
pub struct FileOptions {
    /// Flush page and directory writes to stable storage before returning.
    pub sync_writes: bool,
    /// Counter handle charged with every page and directory access.
    pub stats: Arc<IoStats>,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            sync_writes: false,
            stats: Arc::new(IoStats::new()),
        }
    }
}

impl FileOptions {
    /// Default options with fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`FileOptions::sync_writes`].
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Shares an existing counter handle.
    pub fn stats(mut self, stats: Arc<IoStats>) -> Self {
        self.stats = stats;
        self
    }
}
