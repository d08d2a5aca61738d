//! Move helpers for `move` operations and restores.
//!
//! On POSIX filesystems a move is normally an atomic `rename(2)`. Moving a
//! target into the quarantine can still cross devices (bind mounts,
//! containers, a destination on another volume), surfacing `EXDEV`. For
//! those cases we fall back to copy + delete.

use super::copy::{copy_path, remove_path};
use crate::error::{GuardError, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Move a file or directory from `source` to `destination`.
///
/// - Tries `rename()` first (atomic when possible).
/// - Falls back to a recursive copy + delete of `source` on EXDEV.
pub fn move_path<P: AsRef<Path>, Q: AsRef<Path>>(source: P, destination: Q) -> Result<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create destination directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_rename(&e) => move_cross_device(source, destination, e),
        Err(e) => Err(GuardError::UserError(format!(
            "failed to move '{}' to '{}': {}",
            source.display(),
            destination.display(),
            e
        ))),
    }
}

fn move_cross_device(source: &Path, destination: &Path, original_error: io::Error) -> Result<()> {
    copy_path(source, destination).map_err(|e| {
        GuardError::UserError(format!(
            "failed to copy '{}' for cross-device move: {} (original rename error: {})",
            source.display(),
            e,
            original_error
        ))
    })?;

    remove_path(source).map_err(|e| {
        GuardError::UserError(format!(
            "moved '{}' across devices but failed to delete the source: {}",
            source.display(),
            e
        ))
    })
}

fn is_cross_device_rename(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn move_path_moves_file_and_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();

        let source = source_dir.join("file.txt");
        std::fs::write(&source, b"hello").unwrap();

        let destination = temp.path().join("dest/nested/file.txt");
        move_path(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(&destination).unwrap(), b"hello");
    }

    #[test]
    fn move_path_moves_directory_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("cache");
        std::fs::create_dir_all(source.join("inner")).unwrap();
        std::fs::write(source.join("inner/a.bin"), b"a").unwrap();

        let destination = temp.path().join("quarantine/cache");
        move_path(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(destination.join("inner/a.bin")).unwrap(), b"a");
    }

    #[test]
    fn move_path_missing_source_is_error() {
        let temp = TempDir::new().unwrap();
        let err = move_path(temp.path().join("nope"), temp.path().join("dest")).unwrap_err();
        assert!(err.to_string().contains("failed to move"));
    }
}
