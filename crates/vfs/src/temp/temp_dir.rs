use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::provider::ProviderInner;
use super::TempError;

/// A temporary directory handed out by a
///  [`TempFileProvider`](super::TempFileProvider)
///
/// Closing (or dropping) the handle deletes the directory through the
/// provider's cleanup machinery. Closing the provider deletes it too,
/// whether or not the handle is still around.
pub struct TempDir {
    provider: Arc<ProviderInner>,
    path: PathBuf,
    open: AtomicBool,
}

impl TempDir {
    pub(crate) fn new(provider: Arc<ProviderInner>, path: PathBuf) -> Self {
        Self {
            provider,
            path,
            open: AtomicBool::new(true),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Root of the provider this directory belongs to
    pub fn provider_root(&self) -> &Path {
        self.provider.root()
    }

    /// Open until closed itself or until its provider closes
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && self.provider.is_open()
    }

    /// Path of `relative` inside this directory
    ///
    /// The path must stay below the directory: absolute paths and `..`
    /// components are rejected.
    pub fn get_file(&self, relative: impl AsRef<Path>) -> Result<PathBuf, TempError> {
        if !self.is_open() {
            return Err(TempError::Closed);
        }

        let relative = relative.as_ref();
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(TempError::InvalidPath {
                        path: relative.to_path_buf(),
                        reason: "path escapes the temp directory",
                    })
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(TempError::InvalidPath {
                        path: relative.to_path_buf(),
                        reason: "path must be relative",
                    })
                }
            }
        }

        Ok(self.path.join(relative))
    }

    /// Copy `contents` into a new file at `relative`, creating parents
    pub fn create_file(
        &self,
        relative: impl AsRef<Path>,
        mut contents: impl Read,
    ) -> Result<PathBuf, TempError> {
        let target = self.get_file(relative)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TempError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let mut file = std::fs::File::create(&target)
            .map_err(|e| TempError::io(format!("creating file {}", target.display()), e))?;
        std::io::copy(&mut contents, &mut file)
            .map_err(|e| TempError::io(format!("writing file {}", target.display()), e))?;

        Ok(target)
    }

    /// Delete this directory; later calls do nothing
    pub fn close(&self) -> bool {
        if !self.open.swap(false, Ordering::AcqRel) {
            return false;
        }
        if self.provider.is_open() {
            self.provider.schedule_delete(self.path.clone());
        }
        true
    }

    /// Give up the handle without deleting the directory
    ///
    /// The directory then lives until its provider closes.
    pub fn into_path(self) -> PathBuf {
        self.open.store(false, Ordering::Release);
        self.path.clone()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TempDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempDir")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
