//! RAII lock guard implementation.

use crate::error::{GuardError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// RAII guard for a lock file.
///
/// When dropped, the lock file is automatically deleted.
/// If deletion fails, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manually release the lock, surfacing any error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to release lock '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.path)
        {
            warn!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}

/// All path locks held by one operation run.
///
/// Dropping the set releases every lock in it.
#[derive(Debug, Default)]
pub struct PathLockSet {
    guards: Vec<LockGuard>,
}

impl PathLockSet {
    pub(super) fn push(&mut self, guard: LockGuard) {
        self.guards.push(guard);
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Lock file paths, in acquisition order.
    pub fn paths(&self) -> Vec<&Path> {
        self.guards.iter().map(LockGuard::path).collect()
    }
}
