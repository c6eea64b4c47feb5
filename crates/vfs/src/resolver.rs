//! Resolution of a requested URI to a file view
//!
//! The cache finds the owning context under its read lock and hands the
//! match over here once the lock is released. Whatever the handler or the
//! default resolver does (directory walks, archive reads) never runs while
//! the cache mapping is locked.

use std::sync::Arc;

use url::Url;

use crate::cache::CacheError;
use crate::context::{DefaultResolver, FileRef, MountContext};
use crate::path_key::{relative_path, PathKey};

/// A cached context that owns a requested key
#[derive(Debug, Clone)]
pub struct ContextMatch {
    /// The key the context was indexed under
    pub key: PathKey,
    pub context: Arc<dyn MountContext>,
}

impl ContextMatch {
    /// Path of `target` below this context's root
    pub fn relative_to<'a>(&self, target: &'a PathKey) -> Result<&'a str, CacheError> {
        Ok(relative_path(&self.key, target)?)
    }
}

pub(crate) fn resolve(
    uri: &Url,
    key: &PathKey,
    matched: Option<ContextMatch>,
    fallback: &dyn DefaultResolver,
) -> Result<FileRef, CacheError> {
    match matched {
        Some(matched) => {
            let relative = matched.relative_to(key)?;
            tracing::trace!(
                %uri,
                context = %matched.key,
                relative,
                "resolving through cached context"
            );
            matched
                .context
                .root()
                .child(relative)
                .map_err(|source| CacheError::Resolve {
                    uri: uri.clone(),
                    source,
                })
        }
        None => {
            tracing::trace!(%uri, "no cached context, using default resolution");
            fallback
                .resolve(uri)
                .map_err(|source| CacheError::Resolve {
                    uri: uri.clone(),
                    source,
                })
        }
    }
}
