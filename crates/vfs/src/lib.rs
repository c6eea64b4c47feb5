/**
 * Canonical path keys used to index mounted contexts.
 *  Every key starts and ends with `/`, so string
 *  prefixes mirror mount nesting.
 */
pub mod path_key;
/**
 * Capabilities the cache consumes from the outside:
 *  mounted contexts, their file handlers, and the
 *  fallback resolver used on a cache miss.
 */
pub mod context;
/**
 * Concurrent path-key -> mount-context cache with
 *  pluggable storage and freshness strategies.
 */
pub mod cache;
/**
 * Turns a requested URI into a file view, either through
 *  a cached mount context or the default resolver.
 */
pub mod resolver;
/**
 * Ephemeral, uniquely-named temporary directories and
 *  their retrying background cleanup.
 */
pub mod temp;
/**
 * TOML-backed settings for the cache and temp provider.
 */
pub mod config;

pub mod prelude {
    pub use crate::cache::{CacheError, CacheStatistics, CacheStats, ContextCache};
    pub use crate::config::VfsConfig;
    pub use crate::context::{DefaultResolver, FileHandler, FileRef, MountContext, VirtualFile};
    pub use crate::path_key::{PathKey, PathMismatch};
    pub use crate::temp::{CleanupScheduler, TempDir, TempError, TempFileProvider};
}
