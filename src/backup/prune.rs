//! Retention-based pruning of old backups.

use super::store::BackupStore;
use crate::error::Result;
use crate::events::replay;
use crate::fs::remove_path;
use crate::locks::is_operation_locked;
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedBackup {
    pub backup_id: String,
    pub operation_id: String,
    pub size_bytes: u64,
}

/// What a prune removed (or would remove, in a dry run) and what it kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub cutoff: DateTime<Utc>,
    pub dry_run: bool,
    pub removed: Vec<PrunedBackup>,
    /// Old backups kept because their operation is still in flight.
    pub kept_active: Vec<String>,
    /// Backups that could not be removed, with the reason.
    pub errors: Vec<(String, String)>,
}

impl PruneReport {
    pub fn bytes_freed(&self) -> u64 {
        self.removed.iter().map(|b| b.size_bytes).sum()
    }
}

impl BackupStore {
    /// Remove backups taken before `older_than`.
    ///
    /// A backup is kept, whatever its age, while its operation is locked or
    /// has not reached a terminal state in the event log. Operations with no
    /// events at all count as unfinished.
    pub fn prune(&self, older_than: DateTime<Utc>, dry_run: bool) -> Result<PruneReport> {
        let states = replay(&self.ctx)?;
        let mut report = PruneReport {
            cutoff: older_than,
            dry_run,
            removed: Vec::new(),
            kept_active: Vec::new(),
            errors: Vec::new(),
        };

        for backup in self.list_backups()? {
            let manifest = &backup.manifest;
            if manifest.timestamp >= older_than {
                continue;
            }

            let operation_id = &manifest.operation.operation_id;
            let finished = states
                .get(operation_id)
                .is_some_and(|s| s.status.is_terminal());
            if !finished || is_operation_locked(&self.ctx, operation_id) {
                report.kept_active.push(manifest.backup_id.clone());
                continue;
            }

            if !dry_run && let Err(e) = remove_path(&backup.path) {
                report
                    .errors
                    .push((manifest.backup_id.clone(), e.to_string()));
                continue;
            }

            report.removed.push(PrunedBackup {
                backup_id: manifest.backup_id.clone(),
                operation_id: operation_id.clone(),
                size_bytes: backup.size_bytes,
            });
        }

        info!(
            removed = report.removed.len(),
            kept = report.kept_active.len(),
            dry_run,
            "prune finished"
        );

        Ok(report)
    }
}
