//! Implementation of the `sweepguard scan` and `sweepguard propose` commands.

use super::format_bytes;
use crate::cli::{ProposeArgs, ScanArgs};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::events::{Event, OperationEvent, append_event, operation_state};
use crate::operation::{CleanupOperation, RiskLevel};
use crate::protected::ProtectedPaths;
use crate::scanner::{self, load_proposal, load_scan, save_proposal, save_scan};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

/// Walk the project, print a summary and cache the candidates.
pub fn cmd_scan(ctx: &ProjectContext, config: &Config, args: ScanArgs) -> Result<()> {
    let protected = ProtectedPaths::new(ctx, config)?;
    let max_files = args.max_files.unwrap_or(config.scan_max_files);

    let result = scanner::scan(ctx, &protected, max_files)?;
    ctx.ensure_state_dirs()?;
    save_scan(ctx, &result)?;

    info!(
        candidates = result.targets.len(),
        bytes = result.total_bytes(),
        truncated = result.truncated,
        "scan finished"
    );

    if result.targets.is_empty() {
        println!("No cleanup candidates found.");
        return Ok(());
    }

    let mut by_category: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
    let mut by_risk: BTreeMap<RiskLevel, usize> = BTreeMap::new();
    for target in &result.targets {
        let entry = by_category.entry(target.category.as_str()).or_default();
        entry.0 += 1;
        entry.1 += target.size_bytes;
        *by_risk.entry(target.risk_level).or_default() += 1;
    }

    println!(
        "Found {} candidate(s), {}:",
        result.targets.len(),
        format_bytes(result.total_bytes())
    );
    println!();
    println!("By category:");
    for (category, (count, bytes)) in &by_category {
        println!("  {:<14} {:>6}  {}", category, count, format_bytes(*bytes));
    }
    println!();
    println!("By risk:");
    for (risk, count) in &by_risk {
        println!("  {:<14} {:>6}", risk.as_str(), count);
    }

    if result.truncated {
        println!();
        println!(
            "Note: stopped after {} candidate(s); raise --max-files to see more.",
            max_files
        );
    }

    println!();
    println!("Next: sweepguard propose --risk-level low --max-size-mb 100");
    Ok(())
}

/// Build a proposal from the cached scan, or record a decision on one.
pub fn cmd_propose(ctx: &ProjectContext, args: ProposeArgs) -> Result<()> {
    if let Some(operation_id) = &args.operation {
        if !args.approve && !args.reject {
            return Err(GuardError::UserError(format!(
                "nothing to do for operation '{}': pass --approve or --reject",
                operation_id
            )));
        }
        let operation = load_proposal(ctx, operation_id)?;
        return record_decision(ctx, &operation, &args);
    }

    let Some(scan) = load_scan(ctx)? else {
        return Err(GuardError::UserError(
            "no scan results found; run `sweepguard scan` first".to_string(),
        ));
    };

    let ceiling = RiskLevel::from(args.risk_level);
    let Some(operation) = scanner::propose(&scan.targets, ceiling, args.max_size_mb) else {
        println!(
            "No candidates at or below {} risk fit within {} MB.",
            ceiling, args.max_size_mb
        );
        return Ok(());
    };

    ctx.ensure_state_dirs()?;
    save_proposal(ctx, &operation)?;
    append_event(
        ctx,
        &Event::new(&operation.operation_id, OperationEvent::Proposed).with_details(json!({
            "type": operation.operation_type.as_str(),
            "targets": operation.targets,
            "description": operation.description,
            "risk_ceiling": ceiling.as_str(),
            "max_size_mb": args.max_size_mb,
        })),
    )?;
    info!(operation_id = %operation.operation_id, targets = operation.targets.len(), "proposal saved");

    println!("Proposal {}", operation.operation_id);
    println!("  {}", operation.description);
    println!();
    for target in &operation.targets {
        let rel = ctx.relative(target).unwrap_or(target);
        let risk = operation
            .discovery_risk(target)
            .map_or("unknown", |r| r.as_str());
        println!("  {:<8} {}", risk, rel.display());
    }
    println!();

    if args.approve || args.reject {
        return record_decision(ctx, &operation, &args);
    }

    println!(
        "Approve with: sweepguard propose --operation {} --approve",
        operation.operation_id
    );
    Ok(())
}

/// Append the approval or rejection requested by `args`.
fn record_decision(
    ctx: &ProjectContext,
    operation: &CleanupOperation,
    args: &ProposeArgs,
) -> Result<()> {
    let operation_id = &operation.operation_id;
    if let Some(state) = operation_state(ctx, operation_id)?
        && state.status.is_terminal()
    {
        return Err(GuardError::UserError(format!(
            "operation '{}' is already {}",
            operation_id, state.status
        )));
    }

    let (event, verb) = if args.approve {
        (OperationEvent::UserApproved, "Approved")
    } else {
        (OperationEvent::UserRejected, "Rejected")
    };

    let mut record = Event::new(operation_id, event).with_details(json!({"via": "propose"}));
    if let Some(by) = &args.by {
        record = record.with_actor(by);
    }
    let actor = record.actor.clone();
    append_event(ctx, &record)?;
    info!(operation_id = %operation_id, event = %event, actor = %actor, "decision recorded");

    println!("{} operation {} (by {})", verb, operation_id, actor);
    if args.approve {
        println!("Run it with: sweepguard execute {}", operation_id);
    }
    Ok(())
}
