use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use url::Url;

use super::bounded::{BoundedStore, BoundedStoreConfig};
use super::freshness::{AlwaysFresh, Freshness, FreshnessPolicy, GenerationPolicy, TtlPolicy};
use super::stats::{CacheStatistics, CacheStats, Counters};
use super::store::{ContextStore, MapStore, NoopStore};
use super::CacheError;
use crate::config::{CacheConfig, FreshnessKind, StoreKind};
use crate::context::{DefaultResolver, FileRef, MountContext};
use crate::path_key::PathKey;
use crate::resolver::{self, ContextMatch};

/// Concurrent index of mounted contexts by root key
///
/// Lookups share a read lock, mount and unmount take the write lock.
/// Every public operation consults the freshness policy first and takes
/// its own lock exactly once, so no path ever re-enters a lock it holds.
pub struct ContextCache {
    store: RwLock<Box<dyn ContextStore>>,
    freshness: Arc<dyn FreshnessPolicy>,
    resolver: Arc<dyn DefaultResolver>,
    /// Milliseconds since the Unix epoch, only ever moves forward
    last_insert: AtomicU64,
    counters: Counters,
}

impl ContextCache {
    /// Unbounded map store, never stale
    pub fn new(resolver: Arc<dyn DefaultResolver>) -> Self {
        Self {
            store: RwLock::new(Box::new(MapStore::new())),
            freshness: Arc::new(AlwaysFresh),
            resolver,
            last_insert: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Build a cache with the store and policy named by `config`
    ///
    /// Returns the generation policy when one was configured, since
    /// only its owner can invalidate the cache through it.
    pub fn from_config(
        config: &CacheConfig,
        resolver: Arc<dyn DefaultResolver>,
    ) -> (Self, Option<Arc<GenerationPolicy>>) {
        let cache = match config.store {
            StoreKind::Map => Self::new(resolver),
            StoreKind::Noop => Self::new(resolver).with_store(NoopStore),
            StoreKind::Bounded => Self::new(resolver).with_store(BoundedStore::new(
                BoundedStoreConfig {
                    max_contexts: config.max_contexts,
                    ttl: config.ttl(),
                    idle: config.idle(),
                },
            )),
        };

        match config.freshness {
            FreshnessKind::Always => (cache, None),
            FreshnessKind::Ttl => {
                let policy = TtlPolicy::new(config.freshness_ttl());
                (cache.with_freshness(Arc::new(policy)), None)
            }
            FreshnessKind::Generation => {
                let policy = Arc::new(GenerationPolicy::new());
                (cache.with_freshness(policy.clone()), Some(policy))
            }
        }
    }

    pub fn with_store(self, store: impl ContextStore + 'static) -> Self {
        Self {
            store: RwLock::new(Box::new(store)),
            ..self
        }
    }

    pub fn with_freshness(self, freshness: Arc<dyn FreshnessPolicy>) -> Self {
        Self { freshness, ..self }
    }

    /// Resolve `uri` to a file view
    ///
    /// A URI no cached context owns goes to the default resolver; a miss
    /// on its own is never an error.
    pub fn get_file(&self, uri: &Url) -> Result<FileRef, CacheError> {
        self.check();

        let key = PathKey::from_url(uri);
        let matched = self.find_match(&key);
        match matched {
            Some(_) => Counters::bump(&self.counters.hits),
            None => Counters::bump(&self.counters.misses),
        }

        resolver::resolve(uri, &key, matched, self.resolver.as_ref())
    }

    /// Resolve a URI given in string form
    ///
    /// A string that does not convert to a URI is reported as an I/O
    /// error carrying the parse failure.
    pub fn get_file_str(&self, uri: &str) -> Result<FileRef, CacheError> {
        let url = Url::parse(uri).map_err(|e| CacheError::Conversion {
            input: uri.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        self.get_file(&url)
    }

    /// The context whose key is the longest prefix of `uri`'s key
    pub fn find_context(&self, uri: &Url) -> Option<Arc<dyn MountContext>> {
        self.check();
        self.find_match(&PathKey::from_url(uri))
            .map(|matched| matched.context)
    }

    /// Index a mounted context under its root key
    pub fn put_context(&self, context: Arc<dyn MountContext>) -> Result<(), CacheError> {
        let key = Self::key_for(context.as_ref())?;
        self.check();

        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(
                key = %key,
                ?context,
                "caching context, inserted from:\n{}",
                Backtrace::force_capture()
            );
        }

        let replaced = {
            let mut store = self.store.write();
            let replaced = store.put(key.clone(), context);
            self.last_insert.fetch_max(now_millis(), Ordering::AcqRel);
            replaced
        };

        if replaced.is_some() {
            tracing::debug!(key = %key, "replaced cached context");
        }
        Counters::bump(&self.counters.inserts);
        Ok(())
    }

    /// Drop a context from the index
    ///
    /// Returns whether the cache still held this exact context; a newer
    /// context mounted at the same key is left in place.
    pub fn remove_context(&self, context: &Arc<dyn MountContext>) -> Result<bool, CacheError> {
        let key = Self::key_for(context.as_ref())?;
        self.check();

        let removed = self.store.write().remove(&key, context);

        if removed {
            tracing::trace!(key = %key, "removed cached context");
            Counters::bump(&self.counters.removals);
        }
        Ok(removed)
    }

    /// Milliseconds since the Unix epoch of the last insert, 0 if none
    pub fn last_insert(&self) -> u64 {
        self.last_insert.load(Ordering::Acquire)
    }

    fn key_for(context: &dyn MountContext) -> Result<PathKey, CacheError> {
        let uri = context.root_uri();
        if uri.cannot_be_a_base() {
            return Err(CacheError::InvalidArgument(format!(
                "context root {uri} has no hierarchical path"
            )));
        }
        Ok(PathKey::from_url(uri))
    }

    fn find_match(&self, key: &PathKey) -> Option<ContextMatch> {
        let store = self.store.read();
        store
            .find_longest(key)
            .map(|(key, context)| ContextMatch { key, context })
    }

    fn check(&self) {
        if self.freshness.check() == Freshness::Fresh {
            return;
        }

        let dropped = {
            let mut store = self.store.write();
            let dropped = store.len();
            store.clear();
            dropped
        };

        Counters::bump(&self.counters.invalidations);
        tracing::debug!(dropped, "context cache invalidated");
    }
}

impl CacheStatistics for ContextCache {
    fn cached_contexts(&self) -> Vec<Arc<dyn MountContext>> {
        self.check();
        self.store.read().contexts()
    }

    fn size(&self) -> usize {
        self.check();
        self.store.read().len()
    }

    fn last_insert(&self) -> u64 {
        ContextCache::last_insert(self)
    }

    fn stats(&self) -> CacheStats {
        let size = self.store.read().len();
        self.counters.snapshot(size, self.last_insert())
    }
}

impl std::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field("size", &self.store.read().len())
            .field("last_insert", &self.last_insert())
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::tests::StubContext;

    fn refusing_resolver() -> Arc<dyn DefaultResolver> {
        Arc::new(|uri: &Url| -> anyhow::Result<FileRef> { anyhow::bail!("no default for {uri}") })
    }

    #[test]
    fn test_put_rejects_opaque_root() {
        let cache = ContextCache::new(refusing_resolver());
        let result = cache.put_context(StubContext::arc("urn:isbn:0451450523"));
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert_eq!(cache.last_insert(), 0);
    }

    #[test]
    fn test_last_insert_moves_forward() {
        let cache = ContextCache::new(refusing_resolver());
        cache.put_context(StubContext::arc("file:///a")).unwrap();
        let first = cache.last_insert();
        assert!(first > 0);

        cache.put_context(StubContext::arc("file:///b")).unwrap();
        assert!(cache.last_insert() >= first);
    }

    #[test]
    fn test_remove_is_not_an_insert() {
        let cache = ContextCache::new(refusing_resolver());
        let context = StubContext::arc("file:///a");
        cache.put_context(context.clone()).unwrap();
        let stamp = cache.last_insert();

        assert!(cache.remove_context(&context).unwrap());
        assert!(!cache.remove_context(&context).unwrap());
        assert_eq!(cache.last_insert(), stamp);

        let stats = cache.stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_generation_policy_clears_cache() {
        let policy = Arc::new(GenerationPolicy::new());
        let cache = ContextCache::new(refusing_resolver()).with_freshness(policy.clone());
        cache.put_context(StubContext::arc("file:///a")).unwrap();
        assert_eq!(cache.size(), 1);

        policy.invalidate();
        let uri = Url::parse("file:///a/b").unwrap();
        assert!(cache.find_context(&uri).is_none());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_from_config_wires_generation_policy() {
        let config = CacheConfig {
            freshness: FreshnessKind::Generation,
            ..Default::default()
        };
        let (cache, policy) = ContextCache::from_config(&config, refusing_resolver());
        let policy = policy.unwrap();

        cache.put_context(StubContext::arc("file:///a")).unwrap();
        policy.invalidate();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_from_config_noop_store() {
        let config = CacheConfig {
            store: StoreKind::Noop,
            ..Default::default()
        };
        let (cache, policy) = ContextCache::from_config(&config, refusing_resolver());
        assert!(policy.is_none());

        cache.put_context(StubContext::arc("file:///a")).unwrap();
        let uri = Url::parse("file:///a").unwrap();
        assert!(cache.find_context(&uri).is_none());
    }
}
