//! Backup manifest types.

use crate::error::{GuardError, Result};
use crate::operation::{CleanupOperation, OperationType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub(super) const MANIFEST_FILE: &str = "manifest.json";

/// The parts of an operation a backup needs to describe what it protects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub operation_id: String,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub targets: Vec<PathBuf>,
    pub description: String,
}

impl From<&CleanupOperation> for OperationSnapshot {
    fn from(op: &CleanupOperation) -> Self {
        Self {
            operation_id: op.operation_id.clone(),
            operation_type: op.operation_type,
            targets: op.targets.clone(),
            description: op.description.clone(),
        }
    }
}

/// One backed-up target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Absolute path the target had before the operation.
    pub original: PathBuf,
    /// Location of the copy, relative to the backup directory.
    pub stored: PathBuf,
    /// Where a `move` operation puts the target; removed again on restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<PathBuf>,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: OperationSnapshot,
    pub files: Vec<BackupEntry>,
}

impl BackupManifest {
    /// Parse a manifest file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to read backup manifest '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            GuardError::UserError(format!(
                "failed to parse backup manifest '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            GuardError::UserError(format!("failed to serialize backup manifest: {}", e))
        })
    }
}

/// A manifest plus facts about the backup directory on disk.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub manifest: BackupManifest,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Generate a backup id: `backup_YYYYMMDD_HHMMSS_xxxxxxxx`.
///
/// The timestamp prefix keeps ids sortable; the random suffix keeps two
/// backups taken in the same second apart.
pub fn generate_backup_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("backup_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}
