//! Atomic file replacement.
//!
//! Backup manifests, proposals, the scan cache, config and `modify` results
//! are written through a sibling temp file that is fsynced and then renamed
//! over the target. A reader (`list-backups`, `status`, a pruning run) sees
//! either the old content or the new one, never a prefix.
//!
//! The rename is only atomic within one filesystem, which is why the temp
//! file always lives next to its target. A crash can leave a
//! `.{name}.{suffix}.tmp` file behind; it is never read.

use crate::error::{GuardError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temp file that removes itself unless it was renamed into place.
struct PendingFile {
    path: PathBuf,
    persisted: bool,
}

impl PendingFile {
    fn beside(target: &Path) -> Result<Self> {
        Ok(Self {
            path: temp_path_for(target)?,
            persisted: false,
        })
    }

    fn write_synced(&self, content: &[u8]) -> Result<()> {
        let mut file = File::create(&self.path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create temporary file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        file.write_all(content)
            .and_then(|()| file.sync_all())
            .map_err(|e| {
                GuardError::UserError(format!(
                    "failed to write temporary file '{}': {}",
                    self.path.display(),
                    e
                ))
            })
    }

    fn persist(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target).map_err(|e| {
            GuardError::UserError(format!(
                "failed to atomically replace '{}': {}",
                target.display(),
                e
            ))
        })?;
        self.persisted = true;
        sync_parent(target);
        Ok(())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Atomically replace `path` with `content`, creating parent directories.
///
/// ```no_run
/// use sweepguard::fs::atomic_write;
///
/// atomic_write(".sweepguard/scan.json", b"{}\n")?;
/// # Ok::<(), sweepguard::error::GuardError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let pending = PendingFile::beside(path)?;
    pending.write_synced(content)?;
    pending.persist(path)
}

/// [`atomic_write`] for text.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// `.{name}.{8 hex}.tmp` next to `target`; unique per call so concurrent
/// writers never share a temp file.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            GuardError::UserError(format!("invalid file path '{}'", target.display()))
        })?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let dir = target.parent().unwrap_or(Path::new("."));
    Ok(dir.join(format!(".{}.{}.tmp", name, &suffix[..8])))
}

/// Persist the directory entry of a fresh rename. Best effort.
#[cfg(unix)]
fn sync_parent(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent(_target: &Path) {}
