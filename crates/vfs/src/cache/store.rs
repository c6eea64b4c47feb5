use std::collections::HashMap;
use std::sync::Arc;

use crate::context::MountContext;
use crate::path_key::PathKey;

/// Storage strategy behind a [`ContextCache`](super::ContextCache)
///
/// The cache serializes access: readers call `&self` methods under
/// a shared lock, writers call `&mut self` methods under the exclusive
/// one. Implementations never need their own locking for correctness.
pub trait ContextStore: Send + Sync {
    /// Exact lookup by a normalized key
    fn get(&self, key: &str) -> Option<Arc<dyn MountContext>>;

    /// The context whose key is the longest prefix of `key`,
    ///  along with the key it was stored under
    fn find_longest(&self, key: &PathKey) -> Option<(PathKey, Arc<dyn MountContext>)> {
        key.ancestors().find_map(|candidate| {
            self.get(candidate)
                .map(|context| (PathKey::normalize(candidate), context))
        })
    }

    /// Index `context` under `key`, returning whatever it replaced
    fn put(&mut self, key: PathKey, context: Arc<dyn MountContext>)
        -> Option<Arc<dyn MountContext>>;

    /// Drop the entry for `key` if it still refers to `context`
    fn remove(&mut self, key: &PathKey, context: &Arc<dyn MountContext>) -> bool;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contexts(&self) -> Vec<Arc<dyn MountContext>>;
}

pub(crate) fn same_context(a: &Arc<dyn MountContext>, b: &Arc<dyn MountContext>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Unbounded store over a `HashMap`
///
/// Longest-prefix lookup probes one ancestor key per path segment,
/// so its cost follows the depth of the request, not the number of mounts.
#[derive(Default)]
pub struct MapStore {
    contexts: HashMap<PathKey, Arc<dyn MountContext>>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MapStore {
    fn get(&self, key: &str) -> Option<Arc<dyn MountContext>> {
        self.contexts.get(key).cloned()
    }

    fn put(
        &mut self,
        key: PathKey,
        context: Arc<dyn MountContext>,
    ) -> Option<Arc<dyn MountContext>> {
        self.contexts.insert(key, context)
    }

    fn remove(&mut self, key: &PathKey, context: &Arc<dyn MountContext>) -> bool {
        match self.contexts.get(key) {
            Some(stored) if same_context(stored, context) => {
                self.contexts.remove(key);
                true
            }
            _ => false,
        }
    }

    fn clear(&mut self) {
        self.contexts.clear();
    }

    fn len(&self) -> usize {
        self.contexts.len()
    }

    fn contexts(&self) -> Vec<Arc<dyn MountContext>> {
        self.contexts.values().cloned().collect()
    }
}

/// Store that indexes nothing; every lookup falls through to the
///  default resolver
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl ContextStore for NoopStore {
    fn get(&self, _key: &str) -> Option<Arc<dyn MountContext>> {
        None
    }

    fn put(
        &mut self,
        _key: PathKey,
        _context: Arc<dyn MountContext>,
    ) -> Option<Arc<dyn MountContext>> {
        None
    }

    fn remove(&mut self, _key: &PathKey, _context: &Arc<dyn MountContext>) -> bool {
        false
    }

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }

    fn contexts(&self) -> Vec<Arc<dyn MountContext>> {
        Vec::new()
    }
}
