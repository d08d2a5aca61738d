//! Implementation of the `sweepguard test` command.
//!
//! With paths, builds an operation over real project files. Without, builds
//! one over sandbox files. Either way nothing changes on disk unless
//! `--execute` is given, and a dry run prints the same report every time.

mod sandbox;

#[cfg(test)]
pub(super) use sandbox::{SAMPLE_CONTENT, sample_names};

use super::finish;
use crate::cli::TestArgs;
use crate::config::Config;
use crate::confirm::StdinConfirmer;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::operation::{CleanupOperation, OperationType};
use crate::pipeline::GatePipeline;
use std::path::PathBuf;
use tracing::info;

/// Execute the `sweepguard test` command.
pub fn cmd_test(ctx: &ProjectContext, config: &Config, args: TestArgs) -> Result<()> {
    if !args.execute {
        println!("{}", dry_run_report(ctx, config, &args)?);
        println!();
        println!("Nothing was changed. Re-run with --execute to apply.");
        return Ok(());
    }

    if args.paths.is_empty() {
        let names = sandbox::plan(args.count)?;
        let operation = build_operation(&args, names.clone())?;
        let sandbox_ctx = sandbox::prepare(ctx, &names)?;
        info!(
            sandbox = %sandbox_ctx.project_root.display(),
            files = names.len(),
            "sandbox prepared"
        );
        return execute(&sandbox_ctx, config, operation);
    }

    let operation = build_operation(&args, args.paths.clone())?;
    execute(ctx, config, operation)
}

/// The text a dry run prints. Reads the tree but never writes to it.
pub(in crate::commands) fn dry_run_report(
    ctx: &ProjectContext,
    config: &Config,
    args: &TestArgs,
) -> Result<String> {
    if args.paths.is_empty() {
        let names = sandbox::plan(args.count)?;
        let operation = build_operation(args, names.clone())?;
        return Ok(sandbox::describe(ctx, &operation.description, &names));
    }

    let operation = build_operation(args, args.paths.clone())?;
    let preview = GatePipeline::new(ctx, config)?.preview(&operation)?;
    Ok(preview.to_string())
}

/// Assemble the operation described by the command line.
fn build_operation(args: &TestArgs, targets: Vec<PathBuf>) -> Result<CleanupOperation> {
    let operation_type = OperationType::from(args.op_type);
    let description = format!("test {} of {} path(s)", operation_type, targets.len());
    let mut operation = CleanupOperation::new(operation_type, targets, description)?
        .with_manual_override(args.manual_override);

    match operation_type {
        OperationType::Move => {
            if let Some(destination) = &args.destination {
                operation = operation.with_destination(destination.clone());
            }
        }
        OperationType::Modify => {
            let Some(content) = &args.content else {
                return Err(GuardError::UserError(
                    "modify needs replacement content (--content)".to_string(),
                ));
            };
            operation = operation.with_replacement(content.clone());
        }
        OperationType::Delete => {}
    }

    Ok(operation)
}

fn execute(ctx: &ProjectContext, config: &Config, operation: CleanupOperation) -> Result<()> {
    let outcome = GatePipeline::new(ctx, config)?
        .with_confirmer(Box::new(StdinConfirmer::new()))
        .run(operation);
    finish(outcome)
}
