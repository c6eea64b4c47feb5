//! Shared fixtures for cache and temp provider integration tests
#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use vfs::context::{DefaultResolver, FileHandler, FileRef, MountContext, VirtualFile};
use vfs::temp::Unlinker;

/// Install a test subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// File view handed out by the fixtures
///
/// Files served through a [`TestContext`] carry that context's root URI,
/// files from the default resolver carry the requested URI.
#[derive(Debug)]
pub struct TestFile {
    pub uri: Url,
}

impl VirtualFile for TestFile {
    fn uri(&self) -> &Url {
        &self.uri
    }
}

/// Context whose handler serves any relative path and records it
#[derive(Debug)]
pub struct TestContext {
    pub uri: Url,
    relatives: Mutex<Vec<String>>,
}

impl TestContext {
    pub fn new(uri: &str) -> Arc<Self> {
        Arc::new(Self {
            uri: Url::parse(uri).expect("valid test uri"),
            relatives: Mutex::new(Vec::new()),
        })
    }

    /// Relative paths this context was asked for, in order
    pub fn relatives(&self) -> Vec<String> {
        self.relatives.lock().expect("not poisoned").clone()
    }
}

impl FileHandler for TestContext {
    fn child(&self, relative: &str) -> anyhow::Result<FileRef> {
        self.relatives
            .lock()
            .expect("not poisoned")
            .push(relative.to_string());
        Ok(Arc::new(TestFile {
            uri: self.uri.clone(),
        }))
    }
}

impl MountContext for TestContext {
    fn root_uri(&self) -> &Url {
        &self.uri
    }

    fn root(&self) -> &dyn FileHandler {
        self
    }
}

/// Upcast for the cache API
pub fn mounted(context: &Arc<TestContext>) -> Arc<dyn MountContext> {
    context.clone()
}

/// Default resolver counting how often it was reached
#[derive(Debug, Default)]
pub struct RecordingResolver {
    pub calls: AtomicUsize,
}

impl RecordingResolver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DefaultResolver for RecordingResolver {
    fn resolve(&self, uri: &Url) -> anyhow::Result<FileRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestFile { uri: uri.clone() }))
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).expect("valid test uri")
}

/// Unlinker that refuses to remove files named `locked` for a number
///  of attempts and counts every directory removal
pub struct LockingUnlinker {
    failures: usize,
    file_attempts: AtomicUsize,
    pub dir_removals: AtomicUsize,
}

impl LockingUnlinker {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            file_attempts: AtomicUsize::new(0),
            dir_removals: AtomicUsize::new(0),
        }
    }

    pub fn locked_attempts(&self) -> usize {
        self.file_attempts.load(Ordering::SeqCst)
    }
}

impl Unlinker for LockingUnlinker {
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if path.ends_with("locked") {
            let attempt = self.file_attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "file is locked",
                ));
            }
        }
        std::fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.dir_removals.fetch_add(1, Ordering::SeqCst);
        std::fs::remove_dir(path)
    }
}

/// Poll until `path` disappears
pub async fn wait_until_gone(path: &Path, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while path.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} was not removed within {:?}",
            path.display(),
            timeout
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
