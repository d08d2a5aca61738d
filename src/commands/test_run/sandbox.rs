//! Scratch files for synthetic `test` runs.
//!
//! The sandbox is its own project rooted at `.sweepguard/sandbox/`, so its
//! files are not state paths of the outer project and runs against it never
//! touch the outer project's backups or event log. Files are only written
//! for `--execute`; a dry run describes them.

use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::fs::atomic_write_file;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Content of every sandbox file.
pub(in crate::commands) const SAMPLE_CONTENT: &str = "sweepguard";

/// Sandbox file names, in creation order.
pub(in crate::commands) fn sample_names(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("sample_{}.tmp", i)))
        .collect()
}

/// Names of the files a run with `count` would use.
pub(super) fn plan(count: usize) -> Result<Vec<PathBuf>> {
    if count == 0 {
        return Err(GuardError::UserError(
            "--count must be at least 1 for a sandbox run".to_string(),
        ));
    }
    Ok(sample_names(count))
}

/// Dry-run report for a sandbox run. Reads nothing from disk.
pub(super) fn describe(ctx: &ProjectContext, description: &str, names: &[PathBuf]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dry run: sandbox ({})", description);
    let _ = writeln!(out, "Sandbox: {}", ctx.sandbox_dir().display());
    let _ = writeln!(out, "Would create:");
    for name in names {
        let _ = writeln!(out, "  {} ({} bytes)", name.display(), SAMPLE_CONTENT.len());
    }
    let _ = write!(out, "Gates run against the sandbox with --execute.");
    out
}

/// Create (or refresh) the planned files and return a context rooted at
/// the sandbox.
pub(super) fn prepare(ctx: &ProjectContext, names: &[PathBuf]) -> Result<ProjectContext> {
    let dir = ctx.sandbox_dir();
    std::fs::create_dir_all(&dir).map_err(|e| {
        GuardError::UserError(format!(
            "failed to create sandbox directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    for name in names {
        atomic_write_file(dir.join(name), SAMPLE_CONTENT)?;
    }

    ProjectContext::for_root(&dir)
}
