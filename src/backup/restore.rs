//! Restoring targets from a backup.

use super::store::BackupStore;
use crate::error::{GuardError, Result};
use crate::fs::{copy_path, remove_path};
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome for one backed-up target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    Restored,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreEntry {
    pub original: PathBuf,
    pub status: RestoreStatus,
}

/// Per-file result of a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub backup_id: String,
    pub operation_id: String,
    pub entries: Vec<RestoreEntry>,
}

impl RestoreReport {
    pub fn restored_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == RestoreStatus::Restored)
            .count()
    }

    pub fn failures(&self) -> Vec<&RestoreEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, RestoreStatus::Failed(_)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }

    /// `RollbackFailure` naming every entry that could not be restored.
    pub fn ensure_complete(&self) -> Result<()> {
        let failures = self.failures();
        if failures.is_empty() {
            return Ok(());
        }

        let details: Vec<String> = failures
            .iter()
            .map(|entry| match &entry.status {
                RestoreStatus::Failed(reason) => {
                    format!("{}: {}", entry.original.display(), reason)
                }
                RestoreStatus::Restored => entry.original.display().to_string(),
            })
            .collect();

        Err(GuardError::RollbackFailure(format!(
            "{} of {} file(s) from backup {} not restored: {}",
            failures.len(),
            self.entries.len(),
            self.backup_id,
            details.join("; ")
        )))
    }
}

impl BackupStore {
    /// Put every backed-up target back at its original path.
    ///
    /// Whatever currently occupies an original path is replaced. Every entry
    /// is attempted even after a failure. Returns an error only when the
    /// backup itself cannot be loaded; per-file failures are in the report.
    pub fn restore(&self, backup_id: &str) -> Result<RestoreReport> {
        let manifest = self.load(backup_id)?;
        let dir = self.ctx.backup_dir(backup_id);

        let mut entries = Vec::with_capacity(manifest.files.len());
        for file in &manifest.files {
            let stored = dir.join(&file.stored);
            let status = if stored.symlink_metadata().is_err() {
                RestoreStatus::Failed(format!("stored copy '{}' is missing", stored.display()))
            } else {
                match remove_path(&file.original).and_then(|_| copy_path(&stored, &file.original))
                {
                    Ok(()) => RestoreStatus::Restored,
                    Err(e) => RestoreStatus::Failed(e.to_string()),
                }
            };

            if status == RestoreStatus::Restored
                && let Some(moved_to) = &file.moved_to
                && let Err(e) = remove_path(moved_to)
            {
                warn!(path = %moved_to.display(), error = %e, "failed to remove moved copy");
            }

            if let RestoreStatus::Failed(reason) = &status {
                warn!(path = %file.original.display(), reason = %reason, "restore failed");
            }

            entries.push(RestoreEntry {
                original: file.original.clone(),
                status,
            });
        }

        let report = RestoreReport {
            backup_id: manifest.backup_id.clone(),
            operation_id: manifest.operation.operation_id.clone(),
            entries,
        };

        info!(
            backup_id = %report.backup_id,
            restored = report.restored_count(),
            failed = report.failures().len(),
            "restore finished"
        );

        Ok(report)
    }
}
