//! Size- and time-bounded context store
//!
//! Uses moka for concurrent caching with TTL and capacity-based eviction.
//! Covers the timed and LRU-style cache variants: entries may drop out on
//! their own, after which requests fall back to the default resolver.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use super::store::{same_context, ContextStore};
use crate::context::MountContext;
use crate::path_key::PathKey;

/// Configuration for a [`BoundedStore`]
#[derive(Debug, Clone)]
pub struct BoundedStoreConfig {
    /// Maximum number of indexed contexts (default: 1000)
    pub max_contexts: u64,
    /// Evict a context this long after it was inserted
    pub ttl: Option<Duration>,
    /// Evict a context this long after it was last looked up
    pub idle: Option<Duration>,
}

impl Default for BoundedStoreConfig {
    fn default() -> Self {
        Self {
            max_contexts: 1000,
            ttl: None,
            idle: None,
        }
    }
}

pub struct BoundedStore {
    contexts: Cache<PathKey, Arc<dyn MountContext>>,
}

impl BoundedStore {
    pub fn new(config: BoundedStoreConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_contexts);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(idle) = config.idle {
            builder = builder.time_to_idle(idle);
        }

        Self {
            contexts: builder.build(),
        }
    }
}

impl Default for BoundedStore {
    fn default() -> Self {
        Self::new(BoundedStoreConfig::default())
    }
}

impl ContextStore for BoundedStore {
    fn get(&self, key: &str) -> Option<Arc<dyn MountContext>> {
        self.contexts.get(key)
    }

    fn put(
        &mut self,
        key: PathKey,
        context: Arc<dyn MountContext>,
    ) -> Option<Arc<dyn MountContext>> {
        let previous = self.contexts.get(key.as_str());
        self.contexts.insert(key, context);
        previous
    }

    fn remove(&mut self, key: &PathKey, context: &Arc<dyn MountContext>) -> bool {
        match self.contexts.get(key.as_str()) {
            Some(stored) if same_context(&stored, context) => {
                self.contexts.invalidate(key.as_str());
                true
            }
            _ => false,
        }
    }

    fn clear(&mut self) {
        self.contexts.invalidate_all();
    }

    fn len(&self) -> usize {
        // entry counts lag behind until pending maintenance has run
        self.contexts.run_pending_tasks();
        self.contexts.entry_count() as usize
    }

    fn contexts(&self) -> Vec<Arc<dyn MountContext>> {
        self.contexts.iter().map(|(_, context)| context).collect()
    }
}
