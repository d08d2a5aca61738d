//! Project context resolution for sweepguard.
//!
//! Every pipeline component is constructed from an explicit `ProjectContext`
//! rather than consulting process-wide state. The context pins the project
//! root and derives the on-disk locations of the state directory
//! (`.sweepguard/`): config, backups, event log, locks, proposals and the
//! quarantine used by `move` operations.

use crate::error::{GuardError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the state directory created at the project root.
pub const STATE_DIR_NAME: &str = ".sweepguard";

/// Resolved paths for a sweepguard project.
///
/// All paths are absolute; `project_root` is canonicalized so that target
/// paths can be compared against it component-wise.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Canonical path to the project root.
    pub project_root: PathBuf,

    /// `{project_root}/.sweepguard/`
    pub state_dir: PathBuf,

    /// `{state_dir}/backups/`
    pub backups_dir: PathBuf,

    /// `{state_dir}/locks/`
    pub locks_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            GuardError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the project context starting at `start`.
    ///
    /// Walks up from `start` looking for an existing `.sweepguard/` state
    /// directory; if none is found, `start` itself becomes the project root.
    pub fn resolve_from<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = canonical_dir(start.as_ref())?;

        let root = start
            .ancestors()
            .find(|dir| dir.join(STATE_DIR_NAME).is_dir())
            .map(Path::to_path_buf)
            .unwrap_or(start);

        Ok(Self::at_root(root))
    }

    /// Build a context rooted exactly at `project_root`, without searching
    /// parent directories.
    pub fn for_root<P: AsRef<Path>>(project_root: P) -> Result<Self> {
        let root = canonical_dir(project_root.as_ref())?;
        Ok(Self::at_root(root))
    }

    fn at_root(project_root: PathBuf) -> Self {
        let state_dir = project_root.join(STATE_DIR_NAME);
        let backups_dir = state_dir.join("backups");
        let locks_dir = state_dir.join("locks");

        Self {
            project_root,
            state_dir,
            backups_dir,
            locks_dir,
        }
    }

    /// Create the state directory layout if it does not exist yet.
    pub fn ensure_state_dirs(&self) -> Result<()> {
        for dir in [
            self.state_dir.clone(),
            self.backups_dir.clone(),
            self.locks_dir.clone(),
            self.events_dir(),
            self.proposals_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                GuardError::UserError(format!(
                    "failed to create state directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    /// Get the path to the operation event log.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("operations.ndjson")
    }

    /// Directory holding persisted proposals.
    pub fn proposals_dir(&self) -> PathBuf {
        self.state_dir.join("proposals")
    }

    /// Path to a persisted proposal.
    pub fn proposal_path(&self, operation_id: &str) -> PathBuf {
        self.proposals_dir().join(format!("{}.json", operation_id))
    }

    /// Path to the cached result of the last `scan`.
    pub fn scan_cache_path(&self) -> PathBuf {
        self.state_dir.join("scan.json")
    }

    /// Default destination for `move` operations.
    pub fn quarantine_dir(&self, operation_id: &str) -> PathBuf {
        self.state_dir.join("quarantine").join(operation_id)
    }

    /// Directory where synthetic `test` operations create their files.
    pub fn sandbox_dir(&self) -> PathBuf {
        self.state_dir.join("sandbox")
    }

    /// Get the path to a backup directory.
    pub fn backup_dir(&self, backup_id: &str) -> PathBuf {
        self.backups_dir.join(backup_id)
    }

    /// Lock file guarding a single operation run.
    pub fn operation_lock_path(&self, operation_id: &str) -> PathBuf {
        self.locks_dir.join(format!("op-{}.lock", operation_id))
    }

    /// Lock file guarding a single target path (keyed by a path digest).
    pub fn path_lock_path(&self, digest: &str) -> PathBuf {
        self.locks_dir.join(format!("path-{}.lock", digest))
    }

    /// Whether `path` lives inside the state directory.
    pub fn is_state_path(&self, path: &Path) -> bool {
        path.starts_with(&self.state_dir)
    }

    /// Express `path` relative to the project root for display and matching.
    ///
    /// Returns `None` when the path is outside the project.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.project_root).ok()
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| {
        GuardError::UserError(format!(
            "project root '{}' is not accessible: {}",
            path.display(),
            e
        ))
    })?;

    if !canonical.is_dir() {
        return Err(GuardError::UserError(format!(
            "project root '{}' is not a directory",
            canonical.display()
        )));
    }

    Ok(canonical)
}
