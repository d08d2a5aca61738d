//! Building, saving and loading cleanup proposals.

use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::fs::atomic_write_file;
use crate::operation::{CleanupOperation, CleanupTarget, OperationType, RiskLevel};
use std::collections::BTreeMap;
use std::fs;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Pick candidates at or below `risk_ceiling`, largest first, until the
/// next one would push the total past `size_budget_mb`.
///
/// Returns `None` when nothing qualifies.
pub fn propose(
    targets: &[CleanupTarget],
    risk_ceiling: RiskLevel,
    size_budget_mb: f64,
) -> Option<CleanupOperation> {
    let budget = (size_budget_mb.max(0.0) * BYTES_PER_MB) as u64;

    let mut eligible: Vec<&CleanupTarget> = targets
        .iter()
        .filter(|t| t.risk_level <= risk_ceiling)
        .collect();
    eligible.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.path.cmp(&b.path)));

    let mut chosen = Vec::new();
    let mut total: u64 = 0;
    for target in eligible {
        if total + target.size_bytes > budget {
            break;
        }
        total += target.size_bytes;
        chosen.push(target);
    }

    if chosen.is_empty() {
        return None;
    }

    let paths = chosen.iter().map(|t| t.path.clone()).collect();
    let risk: BTreeMap<_, _> = chosen
        .iter()
        .map(|t| (t.path.clone(), t.risk_level))
        .collect();
    let description = format!(
        "remove {} candidate(s), {:.2} MB, risk at most {}",
        chosen.len(),
        total as f64 / BYTES_PER_MB,
        risk_ceiling
    );

    CleanupOperation::new(OperationType::Delete, paths, description)
        .ok()
        .map(|op| op.with_target_risk(risk))
}

/// Write `operation` to `proposals/<operation_id>.json`.
pub fn save_proposal(ctx: &ProjectContext, operation: &CleanupOperation) -> Result<()> {
    let json = serde_json::to_string_pretty(operation)
        .map_err(|e| GuardError::UserError(format!("failed to serialize proposal: {}", e)))?;
    atomic_write_file(ctx.proposal_path(&operation.operation_id), &json)
}

pub fn load_proposal(ctx: &ProjectContext, operation_id: &str) -> Result<CleanupOperation> {
    if operation_id.is_empty() || operation_id.contains(['/', '\\']) || operation_id.contains("..")
    {
        return Err(GuardError::UserError(format!(
            "invalid operation id '{}'",
            operation_id
        )));
    }

    let path = ctx.proposal_path(operation_id);
    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GuardError::UserError(format!(
                "no proposal found for operation '{}'",
                operation_id
            ))
        } else {
            GuardError::UserError(format!(
                "failed to read proposal '{}': {}",
                path.display(),
                e
            ))
        }
    })?;

    serde_json::from_str(&content).map_err(|e| {
        GuardError::UserError(format!(
            "failed to parse proposal '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Every persisted proposal, oldest first. Unreadable files are skipped.
pub fn list_proposals(ctx: &ProjectContext) -> Result<Vec<CleanupOperation>> {
    let dir = ctx.proposals_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&dir).map_err(|e| {
        GuardError::UserError(format!(
            "failed to read proposals directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut proposals: Vec<CleanupOperation> = entries
        .flatten()
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .filter_map(|entry| {
            let content = fs::read_to_string(entry.path()).ok()?;
            serde_json::from_str(&content).ok()
        })
        .collect();
    proposals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(proposals)
}
