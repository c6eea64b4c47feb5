//! Mount context cache
//!
//! This module maps canonical [`PathKey`](crate::path_key::PathKey)s to
//! mounted contexts and resolves requested URIs through them:
//!
//! - **[`ContextCache`]**: the concurrent index, readers-writer locked
//! - **[`ContextStore`]**: storage strategy ([`MapStore`], [`BoundedStore`], [`NoopStore`])
//! - **[`FreshnessPolicy`]**: validity strategy ([`AlwaysFresh`], [`TtlPolicy`], [`GenerationPolicy`])
//! - **[`CacheStatistics`]**: counters and snapshots for diagnostics
//!
//! # Matching
//!
//! A request is owned by the cached context whose key is the longest
//! prefix of the request's key. With contexts at `/deploy/app.ear/` and
//! `/deploy/app.ear/web.war/`, a request for
//! `/deploy/app.ear/web.war/index.jsp` goes to the inner one:
//! ```text
//! /                                   (default resolution)
//! └── deploy/
//!     └── app.ear/                    context A
//!         ├── lib/util.jar            -> A, "lib/util.jar/"
//!         └── web.war/                context B
//!             └── index.jsp           -> B, "index.jsp/"
//! ```

mod bounded;
mod context_cache;
mod freshness;
mod stats;
mod store;

pub use bounded::{BoundedStore, BoundedStoreConfig};
pub use context_cache::ContextCache;
pub use freshness::{AlwaysFresh, Freshness, FreshnessPolicy, GenerationPolicy, TtlPolicy};
pub use stats::{CacheStatistics, CacheStats};
pub use store::{ContextStore, MapStore, NoopStore};

use url::Url;

use crate::path_key::PathMismatch;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("matched context does not own the request: {0}")]
    PathMismatch(#[from] PathMismatch),

    #[error("failed to convert {input} to a URI: {source}")]
    Conversion {
        input: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve {uri}: {source}")]
    Resolve {
        uri: Url,
        #[source]
        source: anyhow::Error,
    },
}
