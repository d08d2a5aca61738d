//! Lock acquisition, listing, and clearing operations.

use super::guard::{LockGuard, PathLockSet};
use super::metadata::LockMetadata;
use super::types::{LockInfo, LockType};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::protected::normalize_lexically;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Acquire a lock file using create_new semantics.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Successfully acquired lock with RAII guard
/// * `Err(GuardError::LockError)` - Lock already exists (exit code 4)
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create locks directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                GuardError::LockError(describe_holder(lock_path, metadata))
            } else {
                GuardError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        GuardError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        GuardError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(LockGuard::new(lock_path.to_path_buf()))
}

fn describe_holder(lock_path: &Path, wanted: &LockMetadata) -> String {
    let subject = match &wanted.target {
        Some(target) => format!("target '{}'", target.display()),
        None => format!("operation {}", wanted.operation_id),
    };

    match LockMetadata::from_file(lock_path) {
        Ok(meta) => format!(
            "{} is locked by operation {} ({} ago by {}, action: {})",
            subject,
            meta.operation_id,
            meta.age_string(),
            meta.owner,
            meta.action
        ),
        Err(_) => format!("{} is locked\nLock: {}", subject, lock_path.display()),
    }
}

/// Hex SHA-256 digest of a canonical path, used to name path locks.
pub fn path_digest(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())
}

fn canonical_target(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| normalize_lexically(path))
}

/// Acquire the lock for one run of an operation.
pub fn acquire_operation_lock(
    ctx: &ProjectContext,
    operation_id: &str,
    action: &str,
) -> Result<LockGuard> {
    let metadata = LockMetadata::new(action, operation_id);
    acquire_lock(&ctx.operation_lock_path(operation_id), &metadata)
}

/// Acquire path locks for every target, in sorted digest order.
///
/// Either every lock is acquired or none is held when this returns: on a
/// conflict the locks taken so far are released as the partial set drops.
///
/// A target also conflicts with a lock held by another operation on one of
/// its ancestors or descendants. That check runs after our own locks exist,
/// so of two racing operations on nested paths at least one sees the other.
pub fn acquire_path_locks(
    ctx: &ProjectContext,
    operation_id: &str,
    targets: &[PathBuf],
) -> Result<PathLockSet> {
    let mut keyed: Vec<(String, PathBuf)> = targets
        .iter()
        .map(|t| {
            let canonical = canonical_target(t);
            (path_digest(&canonical), canonical)
        })
        .collect();
    keyed.sort();
    keyed.dedup_by(|a, b| a.0 == b.0);

    let mut set = PathLockSet::default();
    for (digest, canonical) in &keyed {
        let metadata = LockMetadata::new("execute", operation_id).with_target(canonical);
        set.push(acquire_lock(&ctx.path_lock_path(digest), &metadata)?);
    }

    let ours: Vec<&Path> = keyed.iter().map(|(_, p)| p.as_path()).collect();
    if let Some(conflict) = nested_conflict(ctx, operation_id, &ours)? {
        return Err(GuardError::LockError(conflict));
    }

    Ok(set)
}

/// Describe a path lock of another operation whose target contains, or is
/// contained in, one of `targets`.
fn nested_conflict(
    ctx: &ProjectContext,
    operation_id: &str,
    targets: &[&Path],
) -> Result<Option<String>> {
    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        GuardError::LockError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_path_lock = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(LockType::from_stem)
            .is_some_and(|(kind, _)| kind == LockType::Path);
        if !is_path_lock {
            continue;
        }

        let Ok(held) = LockMetadata::from_file(&path) else {
            continue;
        };
        if held.operation_id == operation_id {
            continue;
        }
        let Some(held_target) = held.target.as_deref() else {
            continue;
        };

        if let Some(ours) = targets
            .iter()
            .find(|t| t.starts_with(held_target) || held_target.starts_with(t))
        {
            return Ok(Some(format!(
                "target '{}' overlaps '{}', locked by operation {} ({} ago by {}, action: {})",
                ours.display(),
                held_target.display(),
                held.operation_id,
                held.age_string(),
                held.owner,
                held.action
            )));
        }
    }

    Ok(None)
}

/// Whether a run of `operation_id` currently holds its operation lock.
pub fn is_operation_locked(ctx: &ProjectContext, operation_id: &str) -> bool {
    ctx.operation_lock_path(operation_id).exists()
}

/// List all active locks.
///
/// Lock files that cannot be parsed are skipped.
pub fn list_locks(ctx: &ProjectContext, config: &Config) -> Result<Vec<LockInfo>> {
    let mut locks = Vec::new();

    if !ctx.locks_dir.exists() {
        return Ok(locks);
    }

    let entries = fs::read_dir(&ctx.locks_dir).map_err(|e| {
        GuardError::UserError(format!(
            "failed to read locks directory '{}': {}",
            ctx.locks_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            GuardError::UserError(format!("failed to read locks directory entry: {}", e))
        })?;

        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let Ok(metadata) = LockMetadata::from_file(&path) else {
            continue;
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let Some((lock_type, _)) = LockType::from_stem(&name) else {
            continue;
        };

        let is_stale = metadata.is_stale(config.lock_stale_minutes);

        locks.push(LockInfo {
            path,
            name,
            lock_type,
            metadata,
            is_stale,
        });
    }

    locks.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(locks)
}

/// Remove a lock file by name (its file stem, e.g. `op-<operation_id>`).
///
/// The caller is responsible for verifying that clearing the lock is
/// appropriate, typically because it is stale.
pub fn clear_lock(ctx: &ProjectContext, name: &str, config: &Config) -> Result<LockInfo> {
    let Some((lock_type, _)) = LockType::from_stem(name) else {
        return Err(GuardError::UserError(format!(
            "invalid lock name '{}': expected 'op-<id>' or 'path-<digest>'",
            name
        )));
    };

    let lock_path = ctx.locks_dir.join(format!("{}.lock", name));
    if !lock_path.exists() {
        return Err(GuardError::UserError(format!(
            "lock '{}' does not exist at: {}",
            name,
            lock_path.display()
        )));
    }

    let metadata = LockMetadata::from_file(&lock_path)?;
    let is_stale = metadata.is_stale(config.lock_stale_minutes);

    let lock_info = LockInfo {
        path: lock_path.clone(),
        name: name.to_string(),
        lock_type,
        metadata,
        is_stale,
    };

    fs::remove_file(&lock_path).map_err(|e| {
        GuardError::UserError(format!(
            "failed to clear lock '{}': {}",
            lock_path.display(),
            e
        ))
    })?;

    Ok(lock_info)
}
