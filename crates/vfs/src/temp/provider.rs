use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::cleanup::{CleanupScheduler, CleanupTask, StdUnlinker, Unlinker};
use super::names::{self, NameSource, RandomNames};
use super::temp_dir::TempDir;
use super::{base_temp_dir, TempError, BASE_DIR_NAME};
use crate::config::TempConfig;

/// How a provider names and removes what it creates
#[derive(Clone)]
pub struct ProviderOptions {
    /// Parent of the provider root; the shared base directory when unset
    pub base_dir: Option<PathBuf>,
    pub names: Arc<dyn NameSource>,
    pub unlinker: Arc<dyn Unlinker>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            base_dir: None,
            names: Arc::new(RandomNames),
            unlinker: Arc::new(StdUnlinker),
        }
    }
}

impl ProviderOptions {
    /// Roots go under `<base_dir>/vfs`, the same layout `VFS_TMP_DIR` gets
    pub fn from_config(config: &TempConfig) -> Self {
        Self {
            base_dir: config.base_dir.as_ref().map(|dir| dir.join(BASE_DIR_NAME)),
            ..Default::default()
        }
    }
}

/// Factory for temporary directories under one private root
///
/// The provider is either open or closed, and closes exactly once.
/// Closing removes the root and everything handed out from it in the
/// background; dropping an open provider closes it.
pub struct TempFileProvider {
    inner: Arc<ProviderInner>,
}

/// State shared between a provider and the [`TempDir`]s it created
pub(crate) struct ProviderInner {
    kind: String,
    root: PathBuf,
    open: AtomicBool,
    scheduler: Option<CleanupScheduler>,
    names: Arc<dyn NameSource>,
    unlinker: Arc<dyn Unlinker>,
}

impl TempFileProvider {
    /// Create a provider rooted at `<base>/vfs/<kind>-<hex>`
    ///
    /// Without a scheduler, cleanup gets a single inline pass on close.
    pub fn create(kind: &str, scheduler: Option<CleanupScheduler>) -> Result<Self, TempError> {
        Self::with_options(kind, scheduler, ProviderOptions::default())
    }

    pub fn with_options(
        kind: &str,
        scheduler: Option<CleanupScheduler>,
        options: ProviderOptions,
    ) -> Result<Self, TempError> {
        let base = options
            .base_dir
            .unwrap_or_else(|| base_temp_dir().to_path_buf());
        std::fs::create_dir_all(&base).map_err(|e| {
            TempError::io(format!("creating temp base directory {}", base.display()), e)
        })?;

        let root = names::create_unique_dir(&base, kind, options.names.as_ref(), || {
            format!("root '{}' (prefix '{}-')", base.display(), kind)
        })?;
        tracing::debug!(?root, kind, "created temp file provider");

        Ok(Self {
            inner: Arc::new(ProviderInner {
                kind: kind.to_string(),
                root,
                open: AtomicBool::new(true),
                scheduler,
                names: options.names,
                unlinker: options.unlinker,
            }),
        })
    }

    /// Create a fresh directory named `<original_name>-<hex>`
    pub fn create_temp_dir(&self, original_name: &str) -> Result<TempDir, TempError> {
        ProviderInner::create_temp_dir(&self.inner, original_name)
    }

    /// Close the provider and delete its root
    ///
    /// Returns whether this call did the closing; later calls do nothing.
    /// Deletion finishes in the background when a scheduler is running.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn kind(&self) -> &str {
        &self.inner.kind
    }
}

impl Drop for TempFileProvider {
    fn drop(&mut self) {
        if self.inner.is_open() {
            tracing::debug!(root = ?self.inner.root, "temp file provider dropped while open, closing");
            self.inner.close();
        }
    }
}

impl std::fmt::Debug for TempFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempFileProvider")
            .field("kind", &self.inner.kind)
            .field("root", &self.inner.root)
            .field("open", &self.inner.is_open())
            .finish()
    }
}

impl ProviderInner {
    fn create_temp_dir(this: &Arc<Self>, original_name: &str) -> Result<TempDir, TempError> {
        if !this.is_open() {
            return Err(TempError::Closed);
        }
        if original_name.contains(['/', '\\']) {
            return Err(TempError::InvalidPath {
                path: PathBuf::from(original_name),
                reason: "original name must not contain path separators",
            });
        }

        let path = names::create_unique_dir(&this.root, original_name, this.names.as_ref(), || {
            format!("original name '{}'", original_name)
        });

        // a close racing this call may have swept the root already
        if !this.is_open() {
            if path.is_ok() {
                this.schedule_delete(this.root.clone());
            }
            return Err(TempError::Closed);
        }

        let path = path?;
        tracing::trace!(?path, "created temp dir");
        Ok(TempDir::new(this.clone(), path))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    fn close(&self) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }

        tracing::debug!(root = ?self.root, "closing temp file provider");
        self.schedule_delete(self.root.clone());
        true
    }

    /// Remove `path` now if possible, retrying through the scheduler
    pub(crate) fn schedule_delete(&self, path: PathBuf) {
        let task = CleanupTask::new(path, self.unlinker.clone());
        let task = match &self.scheduler {
            Some(scheduler) => match scheduler.spawn(task) {
                Ok(()) => return,
                Err(task) => task,
            },
            None => task,
        };
        task.run_once();
    }
}
