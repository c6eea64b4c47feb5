//! Temporary directory provider
//!
//! - **[`TempFileProvider`]**: owns one private root under the shared base
//!   directory and hands out uniquely named subdirectories
//! - **[`TempDir`]**: handle for one such subdirectory
//! - **[`CleanupScheduler`]**: runs the retrying removal of closed roots
//!
//! # Layout
//!
//! ```text
//! <base>/vfs/                       shared, process-wide
//! ├── deploy-3f9a1c0de2b47781/       provider root (kind "deploy")
//! │   ├── app.war-90ab11c3f0e2d4a7/  TempDir for "app.war"
//! │   └── lib.jar-5c2e0f917ab3e6d0/
//! └── deploy-c81d07e6a95f2b13/       another provider, never shared
//! ```
//!
//! # Cleanup
//!
//! Closing a provider deletes its root bottom-up, best effort. Whatever
//! survives a pass (a file held open on some platforms, say) is retried
//! on the scheduler every [`DEFAULT_RETRY_DELAY`] until it is gone or the
//! scheduler shuts down. Without a scheduler one pass runs inline and any
//! leftovers are abandoned.

mod cleanup;
mod names;
mod provider;
mod temp_dir;

pub use cleanup::{
    recursive_delete, CleanupScheduler, DeleteReport, StdUnlinker, Unlinker, DEFAULT_RETRY_DELAY,
};
pub use names::{NameSource, RandomNames, CREATE_ATTEMPTS};
pub use provider::{ProviderOptions, TempFileProvider};
pub use temp_dir::TempDir;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable overriding the system temp directory
pub const TMP_DIR_ENV: &str = "VFS_TMP_DIR";

/// Name of the shared directory all provider roots live under
pub const BASE_DIR_NAME: &str = "vfs";

static BASE_TEMP_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The shared base directory for provider roots
///
/// Resolved on first use from `VFS_TMP_DIR`, falling back to the system
/// temp directory, and never re-read afterwards.
pub fn base_temp_dir() -> &'static Path {
    BASE_TEMP_DIR.get_or_init(|| {
        std::env::var_os(TMP_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
            .join(BASE_DIR_NAME)
    })
}

/// Errors that can occur while creating or using temp directories
#[derive(Debug, thiserror::Error)]
pub enum TempError {
    #[error("temp file provider closed")]
    Closed,

    #[error("could not create directory for {target} after {attempts} attempts")]
    CreationExhausted { target: String, attempts: usize },

    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl TempError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
