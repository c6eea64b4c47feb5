//! Capabilities consumed by the context cache
//!
//! Concrete backends (exploded directories, archives, in-memory trees) live
//! outside this crate. The cache only needs a mounted context to tell it
//! where it is rooted and how to resolve a path below that root.

use std::fmt::Debug;
use std::sync::Arc;

use url::Url;

/// A resolved, file-like view handed back to callers
pub trait VirtualFile: Send + Sync + Debug {
    /// The URI this view was resolved for
    fn uri(&self) -> &Url;
}

/// Shared handle to a resolved file view
pub type FileRef = Arc<dyn VirtualFile>;

/// Resolves paths below the root of a mounted context
pub trait FileHandler: Send + Sync {
    /// Resolve `relative` (possibly empty, for the root itself)
    ///  to a file view
    fn child(&self, relative: &str) -> anyhow::Result<FileRef>;
}

/// A mounted subtree of the virtual namespace
///
/// Created and destroyed by whatever manages mounts; the cache only
/// indexes contexts by the key of their root URI.
pub trait MountContext: Send + Sync + Debug {
    fn root_uri(&self) -> &Url;

    fn root(&self) -> &dyn FileHandler;
}

/// Resolution used when no cached context owns a URI
pub trait DefaultResolver: Send + Sync {
    fn resolve(&self, uri: &Url) -> anyhow::Result<FileRef>;
}

impl<F> DefaultResolver for F
where
    F: Fn(&Url) -> anyhow::Result<FileRef> + Send + Sync,
{
    fn resolve(&self, uri: &Url) -> anyhow::Result<FileRef> {
        self(uri)
    }
}
