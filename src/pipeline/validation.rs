//! Post-operation checks.

use super::GatePipeline;
use super::context::OperationContext;
use crate::operation::OperationType;
use std::path::Path;

/// A caller-supplied check run after execution. `Err` carries the reason.
pub type PostCheck = Box<dyn Fn(&OperationContext) -> Result<(), String> + Send + Sync>;

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Every failed check, built-in first, then registered checks in order.
pub(super) fn post_check_failures(pipeline: &GatePipeline, octx: &OperationContext) -> Vec<String> {
    let mut failures = Vec::new();
    let op = &octx.operation;
    let quarantine = pipeline.ctx.quarantine_dir(&op.operation_id);

    for target in &octx.touched {
        let shown = pipeline.ctx.relative(target).unwrap_or(target).display().to_string();
        match op.operation_type {
            OperationType::Delete => {
                if exists(target) {
                    failures.push(format!("'{}' still exists after delete", shown));
                }
            }
            OperationType::Move => {
                if exists(target) {
                    failures.push(format!("'{}' still exists after move", shown));
                }
                match op.moved_path(target, &quarantine) {
                    Some(moved) if exists(&moved) => {}
                    Some(moved) => failures.push(format!(
                        "'{}' did not arrive at '{}'",
                        shown,
                        moved.display()
                    )),
                    None => failures.push(format!("no destination for '{}'", shown)),
                }
            }
            OperationType::Modify => {
                let Some(expected) = op.replacement.as_deref() else {
                    failures.push(format!("no replacement content for '{}'", shown));
                    continue;
                };
                match std::fs::read_to_string(target) {
                    Ok(content) if content == expected => {}
                    Ok(_) => failures.push(format!("'{}' does not hold the new content", shown)),
                    Err(e) => failures.push(format!("cannot read '{}': {}", shown, e)),
                }
            }
        }
    }

    for path in &octx.protected_before {
        if !exists(path) {
            failures.push(format!(
                "protected path '{}' disappeared",
                pipeline.ctx.relative(path).unwrap_or(path).display()
            ));
        }
    }

    for (name, check) in &pipeline.post_checks {
        if let Err(reason) = check(octx) {
            failures.push(format!("{}: {}", name, reason));
        }
    }

    failures
}
