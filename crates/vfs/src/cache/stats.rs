use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::MountContext;

/// Introspection exposed by every context cache
pub trait CacheStatistics {
    /// Snapshot of the contexts currently indexed
    fn cached_contexts(&self) -> Vec<Arc<dyn MountContext>>;

    /// Number of contexts currently indexed
    fn size(&self) -> usize;

    /// Milliseconds since the Unix epoch of the last successful insert,
    ///  0 if nothing was ever inserted
    fn last_insert(&self) -> u64;

    fn stats(&self) -> CacheStats;
}

/// Cache statistics for debugging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub removals: u64,
    pub invalidations: u64,
    pub last_insert: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) inserts: AtomicU64,
    pub(crate) removals: AtomicU64,
    pub(crate) invalidations: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize, last_insert: u64) -> CacheStats {
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            last_insert,
        }
    }
}
