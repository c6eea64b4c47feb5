//! Validity strategies consulted before every cache operation
//!
//! A policy only answers whether the cached mapping may still be used.
//! Acting on a stale answer (clearing the store) is the cache's job, so a
//! policy never touches cache locks and can't deadlock against them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Every cached context must be dropped before the operation proceeds
    Stale,
}

pub trait FreshnessPolicy: Send + Sync {
    fn check(&self) -> Freshness;
}

/// Cached contexts never go stale
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFresh;

impl FreshnessPolicy for AlwaysFresh {
    fn check(&self) -> Freshness {
        Freshness::Fresh
    }
}

/// Drops the whole cache once per elapsed window
///
/// The first check after `max_age` has passed reports stale and starts
/// a new window, so concurrent callers trigger one clear between them.
#[derive(Debug)]
pub struct TtlPolicy {
    max_age: Duration,
    window_start: Mutex<Instant>,
}

impl TtlPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            window_start: Mutex::new(Instant::now()),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

impl FreshnessPolicy for TtlPolicy {
    fn check(&self) -> Freshness {
        let mut window_start = self.window_start.lock();
        if window_start.elapsed() >= self.max_age {
            *window_start = Instant::now();
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

/// Goes stale whenever the generation counter moves
///
/// Whoever owns the policy calls [`GenerationPolicy::invalidate`] (after
/// a redeploy, say); the next cache operation sees the new generation and
/// clears the cache.
#[derive(Debug, Default)]
pub struct GenerationPolicy {
    generation: AtomicU64,
    observed: AtomicU64,
}

impl GenerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the generation, returning the new value
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl FreshnessPolicy for GenerationPolicy {
    fn check(&self) -> Freshness {
        let current = self.generation.load(Ordering::Acquire);
        if self.observed.swap(current, Ordering::AcqRel) == current {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_fresh() {
        assert_eq!(AlwaysFresh.check(), Freshness::Fresh);
    }

    #[test]
    fn test_ttl_policy_window() {
        let policy = TtlPolicy::new(Duration::from_millis(40));
        assert_eq!(policy.check(), Freshness::Fresh);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(policy.check(), Freshness::Stale);
        // a new window started with the stale report
        assert_eq!(policy.check(), Freshness::Fresh);
    }

    #[test]
    fn test_generation_policy_reports_each_bump_once() {
        let policy = GenerationPolicy::new();
        assert_eq!(policy.check(), Freshness::Fresh);

        assert_eq!(policy.invalidate(), 1);
        assert_eq!(policy.check(), Freshness::Stale);
        assert_eq!(policy.check(), Freshness::Fresh);

        policy.invalidate();
        policy.invalidate();
        assert_eq!(policy.generation(), 3);
        assert_eq!(policy.check(), Freshness::Stale);
        assert_eq!(policy.check(), Freshness::Fresh);
    }
}
