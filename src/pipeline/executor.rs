//! Applying an operation to one target.

use crate::error::{GuardError, Result};
use crate::fs::{atomic_write, move_path, remove_path};
use crate::operation::{CleanupOperation, OperationType};
use std::path::Path;

/// Performs the destructive step for a single target.
///
/// The pipeline owns ordering, backup and rollback; an executor only
/// changes the filesystem. Alternative executors let embedders (and tests)
/// observe or fault-inject the destructive step.
pub trait TargetExecutor: Send {
    /// `moved_to` is set for `move` operations.
    fn apply(
        &mut self,
        operation: &CleanupOperation,
        target: &Path,
        moved_to: Option<&Path>,
    ) -> Result<()>;
}

/// Executor that acts on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExecutor;

impl TargetExecutor for FsExecutor {
    fn apply(
        &mut self,
        operation: &CleanupOperation,
        target: &Path,
        moved_to: Option<&Path>,
    ) -> Result<()> {
        let result = match operation.operation_type {
            OperationType::Delete => remove_path(target),
            OperationType::Move => match moved_to {
                Some(destination) => move_path(target, destination),
                None => Err(GuardError::UserError(format!(
                    "no destination for '{}'",
                    target.display()
                ))),
            },
            OperationType::Modify => match operation.replacement.as_deref() {
                Some(content) => atomic_write(target, content.as_bytes()),
                None => Err(GuardError::UserError(format!(
                    "no replacement content for '{}'",
                    target.display()
                ))),
            },
        };

        result.map_err(|e| {
            GuardError::ExecutionFailure(format!(
                "{} '{}' failed: {}",
                operation.operation_type,
                target.display(),
                e
            ))
        })
    }
}
