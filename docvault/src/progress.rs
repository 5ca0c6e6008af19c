//! Progress reporting for long-running export/import operations.

/// Which operation a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Export,
    Import,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Export => write!(f, "export"),
            Phase::Import => write!(f, "import"),
        }
    }
}

/// Progress callback, invoked once per collection.
pub trait BackupProgress: Send + Sync {
    /// Called before a collection is read or written. `index` is 0-based
    /// in registry order.
    fn on_collection_start(&self, phase: Phase, index: usize, total: usize, collection: &str);

    /// Called after a collection has been processed.
    /// `records` is the number read (export) or attempted (import).
    fn on_collection_done(&self, phase: Phase, collection: &str, records: usize);

    /// Called when the operation completes.
    fn on_complete(&self, phase: Phase, records: usize);
}

/// No-op progress reporter for when progress isn't needed.
pub struct NoopProgress;

impl BackupProgress for NoopProgress {
    fn on_collection_start(&self, _phase: Phase, _index: usize, _total: usize, _collection: &str) {}
    fn on_collection_done(&self, _phase: Phase, _collection: &str, _records: usize) {}
    fn on_complete(&self, _phase: Phase, _records: usize) {}
}
