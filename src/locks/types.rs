//! Lock type definitions and information structures.

use super::metadata::LockMetadata;
use std::path::PathBuf;

/// Type of lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    /// Serializes runs of one operation.
    Operation,
    /// Keeps concurrent operations off the same target.
    Path,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Operation => "operation",
            LockType::Path => "path",
        }
    }

    /// Infer the lock type from a lock file stem.
    pub(super) fn from_stem(stem: &str) -> Option<(Self, &str)> {
        if let Some(id) = stem.strip_prefix("op-") {
            Some((LockType::Operation, id))
        } else {
            stem.strip_prefix("path-").map(|d| (LockType::Path, d))
        }
    }
}

/// Information about an active lock.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The lock file path.
    pub path: PathBuf,

    /// The lock file stem (e.g., `op-op-20240101-120000-ab12cd34`).
    pub name: String,

    pub lock_type: LockType,

    pub metadata: LockMetadata,

    /// Whether the lock is older than the configured stale threshold.
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] (operation: {}, owner: {}, age: {}, action: {}{})",
            self.name,
            self.lock_type.as_str(),
            self.metadata.operation_id,
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )?;
        if let Some(target) = &self.metadata.target {
            write!(f, " -> {}", target.display())?;
        }
        Ok(())
    }
}
