//! Best-effort recursive deletion and its retry scheduler

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::TempConfig;

/// Delay between cleanup passes over a directory that is not gone yet
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Filesystem removal used by a cleanup pass
pub trait Unlinker: Send + Sync {
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdUnlinker;

impl Unlinker for StdUnlinker {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }
}

/// Outcome of one deletion pass
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Entries removed during this pass
    pub removed: usize,
    /// Entries that could not be removed, with the reason
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl DeleteReport {
    /// Whether nothing under the root survived
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, result: io::Result<()>) {
        match result {
            Ok(()) => self.removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => self.failures.push((path.to_path_buf(), e)),
        }
    }
}

/// Delete `root` and everything below it, children before parents
///
/// Symlinks are removed, never followed. A failing entry is recorded and
/// the walk carries on with its siblings; an already missing root is a
/// clean pass.
pub fn recursive_delete(root: &Path, unlinker: &dyn Unlinker) -> DeleteReport {
    let mut report = DeleteReport::default();
    delete_entry(root, unlinker, &mut report);
    report
}

fn delete_entry(path: &Path, unlinker: &dyn Unlinker, report: &mut DeleteReport) {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => return report.record(path, Err(e)),
    };

    if !metadata.is_dir() {
        return report.record(path, unlinker.remove_file(path));
    }

    match std::fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => delete_entry(&entry.path(), unlinker, report),
                    Err(e) => report.record(path, Err(e)),
                }
            }
        }
        Err(e) => report.record(path, Err(e)),
    }

    report.record(path, unlinker.remove_dir(path));
}

/// Retry state for one directory awaiting removal
///
/// Holds only what a pass needs, never the provider that created the
/// directory, so a pending retry can't keep a provider alive.
pub(crate) struct CleanupTask {
    root: PathBuf,
    unlinker: Arc<dyn Unlinker>,
}

impl CleanupTask {
    pub(crate) fn new(root: PathBuf, unlinker: Arc<dyn Unlinker>) -> Self {
        Self { root, unlinker }
    }

    /// Run one pass; true once the root is gone
    fn attempt(&self) -> bool {
        let report = recursive_delete(&self.root, self.unlinker.as_ref());
        if report.is_clean() {
            tracing::debug!(root = ?self.root, removed = report.removed, "deleted temp root");
            return true;
        }

        for (path, error) in &report.failures {
            tracing::trace!(?path, %error, "failed to delete temp entry");
        }
        false
    }

    /// Single inline pass for when no scheduler can take the task
    pub(crate) fn run_once(self) {
        if !self.attempt() {
            tracing::warn!(
                root = ?self.root,
                "unable to delete temp root and no cleanup scheduler is available, abandoning it"
            );
        }
    }

    async fn run(
        mut pending: Unstarted,
        retry_delay: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let Some(task) = pending.0.take() else {
            return;
        };
        let task = Arc::new(task);
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            let pass = task.clone();
            let done = tokio::task::spawn_blocking(move || pass.attempt())
                .await
                .unwrap_or(false);
            if done {
                return;
            }

            tracing::trace!(
                root = ?task.root,
                attempts,
                "failed to delete temp root, retrying in {:?}",
                retry_delay
            );

            tokio::select! {
                _ = tokio::time::sleep(retry_delay) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        tracing::debug!(
            root = ?task.root,
            attempts,
            "cleanup scheduler shut down, abandoning temp root"
        );
    }
}

/// A task handed to the runtime but not yet polled
///
/// tokio drops tasks spawned onto a runtime that has shut down without
/// polling them; the inline pass then still runs as the task is dropped.
struct Unstarted(Option<CleanupTask>);

impl Drop for Unstarted {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            tracing::debug!(root = ?task.root, "cleanup task dropped before it ran");
            task.run_once();
        }
    }
}

/// Resolves once `shutdown` was called on the scheduler
///
/// Dropping every scheduler clone is not a shutdown: pending retries
/// keep going as long as the runtime does.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs cleanup retries on a tokio runtime
///
/// Cheap to clone; all clones share one shutdown switch. Shutting down
/// (or dropping the runtime behind the handle) cancels every pending
/// retry; dropping the last clone does not. There is no per-task
/// cancellation and no retry limit.
#[derive(Clone)]
pub struct CleanupScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    handle: Handle,
    retry_delay: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl CleanupScheduler {
    pub fn new(handle: Handle) -> Self {
        Self::with_retry_delay(handle, DEFAULT_RETRY_DELAY)
    }

    pub fn with_retry_delay(handle: Handle, retry_delay: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(SchedulerInner {
                handle,
                retry_delay,
                shutdown_tx,
            }),
        }
    }

    /// Scheduler on the runtime the caller is running in, if any
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn from_config(handle: Handle, config: &TempConfig) -> Self {
        Self::with_retry_delay(handle, config.retry_delay())
    }

    pub fn retry_delay(&self) -> Duration {
        self.inner.retry_delay
    }

    /// Stop accepting tasks and cancel every pending retry
    pub fn shutdown(&self) {
        self.inner.shutdown_tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }

    /// Hand `task` to the runtime, or give it back if shut down
    pub(crate) fn spawn(&self, task: CleanupTask) -> Result<(), CleanupTask> {
        if self.is_shutdown() {
            return Err(task);
        }

        let shutdown = self.inner.shutdown_tx.subscribe();
        self.inner
            .handle
            .spawn(CleanupTask::run(
                Unstarted(Some(task)),
                self.inner.retry_delay,
                shutdown,
            ));
        Ok(())
    }
}

impl std::fmt::Debug for CleanupScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScheduler")
            .field("retry_delay", &self.inner.retry_delay)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
