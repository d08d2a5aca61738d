//! Recursive copy, size and removal helpers.
//!
//! Targets may be regular files or whole directory trees (a `__pycache__`
//! folder, a `node_modules` directory). Symlinks are copied as links and
//! never followed, so a backup cannot escape the target it snapshots.

use crate::error::{GuardError, Result};
use std::fs;
use std::path::Path;

/// Copy a file, symlink, or directory tree from `source` to `destination`.
///
/// Parent directories of `destination` are created. File permissions are
/// preserved by `fs::copy`; directory permissions are copied explicitly.
pub fn copy_path<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    let metadata = fs::symlink_metadata(source).map_err(|e| {
        GuardError::UserError(format!("failed to stat '{}': {}", source.display(), e))
    })?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        copy_symlink(source, destination)
    } else if file_type.is_dir() {
        copy_dir(source, destination, &metadata)
    } else {
        fs::copy(source, destination).map(|_| ()).map_err(|e| {
            GuardError::UserError(format!(
                "failed to copy '{}' to '{}': {}",
                source.display(),
                destination.display(),
                e
            ))
        })
    }
}

fn copy_dir(source: &Path, destination: &Path, metadata: &fs::Metadata) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| {
        GuardError::UserError(format!(
            "failed to create directory '{}': {}",
            destination.display(),
            e
        ))
    })?;

    let entries = fs::read_dir(source).map_err(|e| {
        GuardError::UserError(format!(
            "failed to read directory '{}': {}",
            source.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            GuardError::UserError(format!(
                "failed to read entry in '{}': {}",
                source.display(),
                e
            ))
        })?;
        copy_path(entry.path(), destination.join(entry.file_name()))?;
    }

    fs::set_permissions(destination, metadata.permissions()).map_err(|e| {
        GuardError::UserError(format!(
            "failed to set permissions on '{}': {}",
            destination.display(),
            e
        ))
    })
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
    let link = fs::read_link(source).map_err(|e| {
        GuardError::UserError(format!(
            "failed to read symlink '{}': {}",
            source.display(),
            e
        ))
    })?;
    std::os::unix::fs::symlink(&link, destination).map_err(|e| {
        GuardError::UserError(format!(
            "failed to create symlink '{}': {}",
            destination.display(),
            e
        ))
    })
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).map(|_| ()).map_err(|e| {
        GuardError::UserError(format!(
            "failed to copy '{}' to '{}': {}",
            source.display(),
            destination.display(),
            e
        ))
    })
}

/// Remove a file, symlink, or directory tree.
///
/// Removing a path that does not exist is not an error.
pub fn remove_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(GuardError::UserError(format!(
                "failed to stat '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|e| {
        GuardError::UserError(format!("failed to remove '{}': {}", path.display(), e))
    })
}

/// Total size in bytes of a file or directory tree (symlinks count as 0).
///
/// Unreadable entries are skipped; a missing path has size 0.
pub fn path_size<P: AsRef<Path>>(path: P) -> u64 {
    let path = path.as_ref();
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return 0;
    };

    if metadata.is_file() {
        return metadata.len();
    }
    if !metadata.is_dir() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_path_copies_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        std::fs::write(&source, b"alpha").unwrap();

        let destination = temp.path().join("copy/a.txt");
        copy_path(&source, &destination).unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"alpha");
        assert!(source.exists());
    }

    #[test]
    fn copy_path_copies_directory_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("build");
        std::fs::create_dir_all(source.join("deep/er")).unwrap();
        std::fs::write(source.join("top.o"), b"1").unwrap();
        std::fs::write(source.join("deep/er/leaf.o"), b"22").unwrap();

        let destination = temp.path().join("snapshot/build");
        copy_path(&source, &destination).unwrap();

        assert_eq!(std::fs::read(destination.join("top.o")).unwrap(), b"1");
        assert_eq!(
            std::fs::read(destination.join("deep/er/leaf.o")).unwrap(),
            b"22"
        );
    }

    #[cfg(unix)]
    #[test]
    fn copy_path_preserves_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("run.sh");
        std::fs::write(&source, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o750)).unwrap();

        let destination = temp.path().join("copy/run.sh");
        copy_path(&source, &destination).unwrap();

        let mode = std::fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn copy_path_missing_source_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(copy_path(temp.path().join("missing"), temp.path().join("out")).is_err());
    }

    #[test]
    fn remove_path_handles_files_dirs_and_missing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        let dir = temp.path().join("d");
        std::fs::write(&file, b"x").unwrap();
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/g.txt"), b"y").unwrap();

        remove_path(&file).unwrap();
        remove_path(&dir).unwrap();
        remove_path(temp.path().join("never-existed")).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn path_size_sums_tree() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("a"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.join("sub/b"), vec![0u8; 32]).unwrap();

        assert_eq!(path_size(&dir), 42);
        assert_eq!(path_size(dir.join("a")), 10);
        assert_eq!(path_size(temp.path().join("missing")), 0);
    }
}
