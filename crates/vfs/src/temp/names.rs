use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::TempError;

/// Attempts made to find an unused directory name before giving up
pub const CREATE_ATTEMPTS: usize = 10;

/// Source of the random suffixes that make temp names unique
///
/// Needs to be practically collision free, not unpredictable; the retry
/// loop around it absorbs the rare collision.
pub trait NameSource: Send + Sync {
    fn next_suffix(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNames;

impl NameSource for RandomNames {
    fn next_suffix(&self) -> u64 {
        rand::random()
    }
}

pub(crate) fn temp_name(stem: &str, names: &dyn NameSource) -> String {
    format!("{}-{:x}", stem, names.next_suffix())
}

/// Create `parent/<stem>-<hex>`, drawing a fresh name after each collision
///
/// Only an existing entry counts as a collision; any other failure is
/// returned straight away.
pub(crate) fn create_unique_dir(
    parent: &Path,
    stem: &str,
    names: &dyn NameSource,
    target: impl FnOnce() -> String,
) -> Result<PathBuf, TempError> {
    for _ in 0..CREATE_ATTEMPTS {
        let candidate = parent.join(temp_name(stem, names));
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::trace!(?candidate, "temp name collision, retrying");
            }
            Err(e) => {
                return Err(TempError::io(
                    format!("creating directory {}", candidate.display()),
                    e,
                ))
            }
        }
    }

    Err(TempError::CreationExhausted {
        target: target(),
        attempts: CREATE_ATTEMPTS,
    })
}
