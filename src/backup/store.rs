//! Backup creation and enumeration.

use super::manifest::{BackupEntry, BackupInfo, BackupManifest, MANIFEST_FILE, generate_backup_id};
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::fs::{atomic_write_file, copy_path, path_size, remove_path};
use crate::operation::CleanupOperation;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Creates, lists, restores and prunes backups under `.sweepguard/backups/`.
#[derive(Debug, Clone)]
pub struct BackupStore {
    pub(super) ctx: ProjectContext,
}

impl BackupStore {
    pub fn new(ctx: &ProjectContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Snapshot every target of `operation`.
    ///
    /// Targets are copied to `files/<index>/<name>`; the manifest is written
    /// last. On any failure the partial backup directory is removed and
    /// `BackupFailure` is returned.
    pub fn create_backup(&self, operation: &CleanupOperation) -> Result<BackupManifest> {
        fs::create_dir_all(&self.ctx.backups_dir).map_err(|e| {
            GuardError::BackupFailure(format!(
                "failed to create backups directory '{}': {}",
                self.ctx.backups_dir.display(),
                e
            ))
        })?;

        let backup_id = generate_backup_id();
        let dir = self.ctx.backup_dir(&backup_id);
        fs::create_dir(&dir).map_err(|e| {
            GuardError::BackupFailure(format!(
                "failed to create backup directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        match self.write_backup(operation, &backup_id, &dir) {
            Ok(manifest) => {
                info!(
                    backup_id = %manifest.backup_id,
                    operation_id = %operation.operation_id,
                    files = manifest.files.len(),
                    "backup created"
                );
                Ok(manifest)
            }
            Err(e) => {
                if let Err(cleanup) = remove_path(&dir) {
                    warn!(backup_id = %backup_id, error = %cleanup, "failed to remove partial backup");
                }
                Err(e)
            }
        }
    }

    fn write_backup(
        &self,
        operation: &CleanupOperation,
        backup_id: &str,
        dir: &Path,
    ) -> Result<BackupManifest> {
        let quarantine = self.ctx.quarantine_dir(&operation.operation_id);
        let mut files = Vec::with_capacity(operation.targets.len());

        for (index, target) in operation.targets.iter().enumerate() {
            let name = target
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "target".into());
            let stored = PathBuf::from("files").join(index.to_string()).join(name);

            copy_path(target, dir.join(&stored)).map_err(|e| {
                GuardError::BackupFailure(format!(
                    "failed to back up '{}': {}",
                    target.display(),
                    e
                ))
            })?;

            files.push(BackupEntry {
                original: target.clone(),
                stored,
                moved_to: operation.moved_path(target, &quarantine),
            });
        }

        let manifest = BackupManifest {
            backup_id: backup_id.to_string(),
            timestamp: Utc::now(),
            operation: operation.into(),
            files,
        };

        let json = manifest.to_json()?;
        atomic_write_file(dir.join(MANIFEST_FILE), &json).map_err(|e| {
            GuardError::BackupFailure(format!("failed to write backup manifest: {}", e))
        })?;

        Ok(manifest)
    }

    /// All complete backups, newest first.
    ///
    /// Directories without a readable manifest are skipped.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.ctx.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.ctx.backups_dir).map_err(|e| {
            GuardError::UserError(format!(
                "failed to read backups directory '{}': {}",
                self.ctx.backups_dir.display(),
                e
            ))
        })?;

        let mut backups = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Ok(manifest) = BackupManifest::from_file(path.join(MANIFEST_FILE)) else {
                continue;
            };
            backups.push(BackupInfo {
                size_bytes: path_size(&path),
                manifest,
                path,
            });
        }

        backups.sort_by(|a, b| {
            b.manifest
                .timestamp
                .cmp(&a.manifest.timestamp)
                .then_with(|| b.manifest.backup_id.cmp(&a.manifest.backup_id))
        });

        Ok(backups)
    }

    /// Load the manifest for `backup_id`.
    pub fn load(&self, backup_id: &str) -> Result<BackupManifest> {
        validate_backup_id(backup_id)?;

        let manifest_path = self.ctx.backup_dir(backup_id).join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(GuardError::UserError(format!(
                "backup '{}' not found",
                backup_id
            )));
        }

        BackupManifest::from_file(manifest_path)
    }

    /// Most recent backup taken for `operation_id`, if any.
    pub fn latest_for_operation(&self, operation_id: &str) -> Result<Option<BackupInfo>> {
        Ok(self
            .list_backups()?
            .into_iter()
            .find(|b| b.manifest.operation.operation_id == operation_id))
    }

    /// Total bytes used by all backups.
    pub fn total_size(&self) -> u64 {
        path_size(&self.ctx.backups_dir)
    }
}

/// Backup ids are single path components.
fn validate_backup_id(backup_id: &str) -> Result<()> {
    if backup_id.is_empty()
        || backup_id.contains('/')
        || backup_id.contains('\\')
        || backup_id == "."
        || backup_id == ".."
    {
        return Err(GuardError::UserError(format!(
            "invalid backup id '{}'",
            backup_id
        )));
    }
    Ok(())
}
