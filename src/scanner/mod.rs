//! Candidate discovery and proposal building.
//!
//! `scan` walks the project and classifies regenerable files; `propose`
//! turns a scan into one `delete` operation within a risk ceiling and a
//! size budget. Both results can be persisted under `.sweepguard/` so the
//! `scan`, `propose` and `execute` commands can run as separate processes.

mod heuristics;
mod proposal;


pub use heuristics::{Classification, classify};
pub use proposal::{list_proposals, load_proposal, propose, save_proposal};

use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::fs::{atomic_write_file, path_size};
use crate::operation::CleanupTarget;
use crate::protected::ProtectedPaths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// Directories the scanner never enters.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// The result of the last `scan`, as stored in `scan.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scanned_at: DateTime<Utc>,
    pub project_root: PathBuf,
    /// True when the walk stopped at `max_files` candidates.
    pub truncated: bool,
    pub targets: Vec<CleanupTarget>,
}

impl ScanResult {
    pub fn total_bytes(&self) -> u64 {
        self.targets.iter().map(|t| t.size_bytes).sum()
    }
}

/// Walk the project and collect cleanup candidates, in path order.
///
/// Symlinks are not followed; VCS metadata, the state directory and
/// protected paths are never reported. Stops after `max_files` candidates.
pub fn scan(
    ctx: &ProjectContext,
    protected: &ProtectedPaths,
    max_files: usize,
) -> Result<ScanResult> {
    let mut targets = Vec::new();
    let mut truncated = false;

    let walker = WalkDir::new(&ctx.project_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !VCS_DIRS.contains(&name.as_ref()) && !ctx.is_state_path(entry.path())
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            GuardError::UserError(format!("failed to walk project tree: {}", e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let Some(rel) = ctx.relative(&path) else {
            continue;
        };
        let Some(class) = classify(rel) else {
            continue;
        };
        if protected.is_protected(&path) {
            debug!(path = %rel.display(), "skipping protected candidate");
            continue;
        }

        if targets.len() >= max_files {
            truncated = true;
            break;
        }

        targets.push(CleanupTarget {
            size_bytes: path_size(&path),
            path,
            risk_level: class.risk,
            reason: class.reason,
            category: class.category,
        });
    }

    Ok(ScanResult {
        scanned_at: Utc::now(),
        project_root: ctx.project_root.clone(),
        truncated,
        targets,
    })
}

/// Persist `result` to `scan.json`.
pub fn save_scan(ctx: &ProjectContext, result: &ScanResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| GuardError::UserError(format!("failed to serialize scan result: {}", e)))?;
    atomic_write_file(ctx.scan_cache_path(), &json)
}

/// Load the last persisted scan, if any.
pub fn load_scan(ctx: &ProjectContext) -> Result<Option<ScanResult>> {
    let path = ctx.scan_cache_path();
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GuardError::UserError(format!(
                "failed to read scan cache '{}': {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        GuardError::UserError(format!(
            "failed to parse scan cache '{}': {}",
            path.display(),
            e
        ))
    })
}
