//! The six gates an operation passes through, in order.
//!
//! Gates before `BackupExecute` fail closed: nothing on disk has changed
//! when they refuse. From `BackupExecute` on, every failure is rolled back
//! from the backup by the pipeline.

use super::GatePipeline;
use super::context::OperationContext;
use super::validation::post_check_failures;
use crate::config::Config;
use crate::confirm::{Challenge, ConfirmationOutcome, confirm, confirmation_timeout};
use crate::dependency::DependencyReport;
use crate::error::{GuardError, Result};
use crate::events::{OperationEvent, operation_state};
use crate::locks::acquire_path_locks;
use crate::operation::{ConfirmationLevel, OperationStatus, OperationType, RiskLevel};
use crate::protected::normalize_lexically;
use crate::risk;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    Pass(String),
    Fail(String),
    /// The operation may continue once confirmed at `level` or stricter.
    RequireConfirmation(ConfirmationLevel, String),
}

impl GateResult {
    pub fn message(&self) -> &str {
        match self {
            GateResult::Pass(m) | GateResult::Fail(m) | GateResult::RequireConfirmation(_, m) => m,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            GateResult::Pass(_) => "pass",
            GateResult::Fail(_) => "fail",
            GateResult::RequireConfirmation(..) => "confirm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    PreFlight,
    DependencyAnalysis,
    RiskAssessment,
    HumanConfirmation,
    BackupExecute,
    PostOperation,
}

impl Gate {
    pub const ALL: [Gate; 6] = [
        Gate::PreFlight,
        Gate::DependencyAnalysis,
        Gate::RiskAssessment,
        Gate::HumanConfirmation,
        Gate::BackupExecute,
        Gate::PostOperation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Gate::PreFlight => "pre_flight",
            Gate::DependencyAnalysis => "dependency_analysis",
            Gate::RiskAssessment => "risk_assessment",
            Gate::HumanConfirmation => "human_confirmation",
            Gate::BackupExecute => "backup_execute",
            Gate::PostOperation => "post_operation",
        }
    }

    /// Only dependency analysis and post-validation can be switched off.
    pub fn enabled(&self, config: &Config) -> bool {
        match self {
            Gate::DependencyAnalysis => config.dependency_analysis,
            Gate::PostOperation => config.post_validation,
            _ => true,
        }
    }

    /// Gates that touch the filesystem; panics inside them trigger rollback.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Gate::BackupExecute | Gate::PostOperation)
    }

    /// Error used when a gate fails without naming a more specific one.
    pub(super) fn default_error(&self, message: String) -> GuardError {
        match self {
            Gate::PreFlight | Gate::RiskAssessment => GuardError::PolicyViolation(message),
            Gate::DependencyAnalysis => GuardError::UserError(message),
            Gate::HumanConfirmation => GuardError::UnconfirmedRisk(message),
            Gate::BackupExecute => GuardError::ExecutionFailure(message),
            Gate::PostOperation => GuardError::PostValidationFailure(message),
        }
    }

    pub fn validate(&self, pipeline: &mut GatePipeline, octx: &mut OperationContext) -> GateResult {
        let result = match self {
            Gate::PreFlight => pre_flight(pipeline, octx, true),
            Gate::DependencyAnalysis => dependency_analysis(pipeline, octx),
            Gate::RiskAssessment => risk_assessment(pipeline, octx),
            Gate::HumanConfirmation => human_confirmation(pipeline, octx),
            Gate::BackupExecute => backup_execute(pipeline, octx),
            Gate::PostOperation => post_operation(pipeline, octx),
        };

        match result {
            Ok(r) => r,
            Err(e) => octx.fail(e),
        }
    }
}

fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&root.join(path))
    }
}

fn display_rel(pipeline: &GatePipeline, path: &Path) -> String {
    pipeline
        .ctx
        .relative(path)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Structural checks, protected-path veto and path locks.
///
/// With `acquire_locks` false (dry run) nothing is written to disk.
pub(super) fn pre_flight(
    pipeline: &GatePipeline,
    octx: &mut OperationContext,
    acquire_locks: bool,
) -> Result<GateResult> {
    let root = pipeline.ctx.project_root.clone();
    let op = &mut octx.operation;

    if op.status != OperationStatus::Proposed {
        return Err(GuardError::UserError(format!(
            "operation {} is {}; only proposed operations can run",
            op.operation_id, op.status
        )));
    }

    if let Some(state) = operation_state(&pipeline.ctx, &op.operation_id)?
        && state.status.is_terminal()
    {
        return Err(GuardError::UserError(format!(
            "operation {} is already {}",
            op.operation_id,
            state.status.as_str()
        )));
    }

    op.targets = op.targets.iter().map(|t| absolutize(&root, t)).collect();
    op.validate_targets()?;

    for target in &op.targets {
        if let Some(reason) = pipeline.protected.protection_reason(target) {
            return Err(GuardError::PolicyViolation(format!(
                "target '{}' is protected: {}",
                display_rel(pipeline, target),
                reason
            )));
        }
    }

    for target in &op.targets {
        if target.symlink_metadata().is_err() {
            return Err(GuardError::UserError(format!(
                "target '{}' does not exist",
                display_rel(pipeline, target)
            )));
        }
    }

    match op.operation_type {
        OperationType::Delete => {}
        OperationType::Modify => {
            if op.replacement.is_none() {
                return Err(GuardError::UserError(
                    "modify needs replacement content".to_string(),
                ));
            }
            if let Some(dir) = op.targets.iter().find(|t| t.is_dir()) {
                return Err(GuardError::UserError(format!(
                    "modify target '{}' is a directory",
                    display_rel(pipeline, dir)
                )));
            }
        }
        OperationType::Move => {
            if let Some(destination) = op.destination.take() {
                let destination = absolutize(&root, &destination);
                if pipeline.protected.is_protected(&destination) {
                    return Err(GuardError::PolicyViolation(format!(
                        "move destination '{}' is protected",
                        destination.display()
                    )));
                }
                op.destination = Some(destination);
            }

            let quarantine = pipeline.ctx.quarantine_dir(&op.operation_id);
            let mut seen = HashSet::new();
            for target in &op.targets {
                let Some(moved) = op.moved_path(target, &quarantine) else {
                    return Err(GuardError::UserError(format!(
                        "cannot derive a destination for '{}'",
                        target.display()
                    )));
                };
                if moved.starts_with(target) {
                    return Err(GuardError::UserError(format!(
                        "cannot move '{}' into itself",
                        display_rel(pipeline, target)
                    )));
                }
                if moved.symlink_metadata().is_ok() {
                    return Err(GuardError::UserError(format!(
                        "move destination '{}' already exists",
                        moved.display()
                    )));
                }
                if !seen.insert(moved.clone()) {
                    return Err(GuardError::UserError(format!(
                        "two targets would move to '{}'",
                        moved.display()
                    )));
                }
            }
        }
    }

    let mut watched_dirs = BTreeSet::new();
    watched_dirs.insert(root.clone());
    for target in &op.targets {
        if let Some(parent) = target.parent()
            && parent.starts_with(&root)
        {
            watched_dirs.insert(parent.to_path_buf());
        }
    }
    octx.protected_before = watched_dirs
        .iter()
        .flat_map(|dir| pipeline.protected.protected_entries(dir))
        .collect();

    let count = octx.operation.targets.len();
    if acquire_locks {
        let locks = acquire_path_locks(
            &pipeline.ctx,
            &octx.operation.operation_id,
            &octx.operation.targets,
        )?;
        octx.path_locks = Some(locks);
    }

    Ok(GateResult::Pass(format!(
        "{} target(s) checked, none protected",
        count
    )))
}

pub(super) fn dependency_analysis(
    pipeline: &GatePipeline,
    octx: &mut OperationContext,
) -> Result<GateResult> {
    let report = pipeline.analyzer.analyze(&octx.operation.targets)?;

    let result = if report.has_dependents() {
        let listed: Vec<String> = report
            .targets_with_dependents()
            .iter()
            .take(3)
            .map(|t| display_rel(pipeline, t))
            .collect();
        GateResult::RequireConfirmation(
            ConfirmationLevel::Simple,
            format!(
                "{} target(s) referenced by {} file(s): {}",
                report.targets_with_dependents().len(),
                report.dependent_count(),
                listed.join(", ")
            ),
        )
    } else {
        GateResult::Pass("no references to targets found".to_string())
    };

    octx.dependency_report = Some(report);
    Ok(result)
}

pub(super) fn risk_assessment(
    pipeline: &GatePipeline,
    octx: &mut OperationContext,
) -> Result<GateResult> {
    let empty = DependencyReport::default();
    let report = octx.dependency_report.as_ref().unwrap_or(&empty);
    let assessment = risk::assess(
        &octx.operation,
        report,
        &pipeline.protected,
        &pipeline.config.normalized_extensions(),
    );

    let mut level = assessment.confirmation_required;
    if assessment.level == RiskLevel::Medium
        && !pipeline.config.require_confirmation_for_medium_risk
        && !report.has_dependents()
    {
        level = ConfirmationLevel::None;
    }

    info!(
        operation_id = %octx.operation.operation_id,
        level = %assessment.level,
        score = assessment.score,
        "risk assessed"
    );

    let message = format!(
        "risk {} (score {:.1}): {}",
        assessment.level,
        assessment.score,
        assessment.factors.join("; ")
    );
    octx.risk = Some(assessment);

    Ok(if level == ConfirmationLevel::None {
        GateResult::Pass(message)
    } else {
        GateResult::RequireConfirmation(level, message)
    })
}

fn human_confirmation(
    pipeline: &mut GatePipeline,
    octx: &mut OperationContext,
) -> Result<GateResult> {
    let required = pipeline.final_confirmation(octx.required_confirmation);

    if octx.risk.as_ref().is_some_and(|r| r.manual_override_required)
        && !octx.operation.manual_override
    {
        return Err(GuardError::UnconfirmedRisk(
            "critical risk requires an explicit manual override".to_string(),
        ));
    }

    if required == ConfirmationLevel::None {
        octx.operation.transition(OperationStatus::Confirmed)?;
        return Ok(GateResult::Pass("no confirmation required".to_string()));
    }

    octx.operation
        .transition(OperationStatus::AwaitingConfirmation)?;

    let timeout = confirmation_timeout(&pipeline.config, required, octx.operation.targets.len());
    let challenge = Challenge::generate(required, confirmation_prompt(octx), timeout);

    match confirm(pipeline.confirmer.as_mut(), &challenge) {
        ConfirmationOutcome::Confirmed { by } => {
            octx.operation.confirmed_by = Some(by.clone());
            octx.operation.transition(OperationStatus::Confirmed)?;
            pipeline.record_event(
                &octx.operation.operation_id,
                OperationEvent::UserApproved,
                Some(&by),
                json!({"confirmation": required.as_str()}),
            );
            Ok(GateResult::Pass(format!(
                "{} confirmation given by {}",
                required, by
            )))
        }
        ConfirmationOutcome::Denied { reason } => {
            octx.user_denied = true;
            Err(GuardError::UnconfirmedRisk(reason))
        }
    }
}

fn confirmation_prompt(octx: &OperationContext) -> String {
    let op = &octx.operation;
    let mut prompt = format!(
        "Operation {}: {} {} target(s) ({})",
        op.operation_id,
        op.operation_type,
        op.targets.len(),
        op.description
    );
    if let Some(risk) = &octx.risk {
        prompt.push_str(&format!(
            "\nRisk: {} (score {:.1})",
            risk.level, risk.score
        ));
        for factor in &risk.factors {
            prompt.push_str(&format!("\n  - {}", factor));
        }
    }
    prompt
}

fn backup_execute(pipeline: &mut GatePipeline, octx: &mut OperationContext) -> Result<GateResult> {
    octx.operation.transition(OperationStatus::BackingUp)?;
    let manifest = pipeline.store.create_backup(&octx.operation)?;
    let backup_id = manifest.backup_id.clone();
    octx.backup = Some(manifest);

    octx.operation.transition(OperationStatus::Executing)?;

    let quarantine = pipeline.ctx.quarantine_dir(&octx.operation.operation_id);
    let targets = octx.operation.targets.clone();
    for target in targets {
        let moved = octx.operation.moved_path(&target, &quarantine);
        pipeline
            .executor
            .apply(&octx.operation, &target, moved.as_deref())
            .map_err(|e| match e {
                GuardError::ExecutionFailure(_) => e,
                other => GuardError::ExecutionFailure(other.to_string()),
            })?;
        octx.touched.push(target);
    }

    Ok(GateResult::Pass(format!(
        "backup {} taken; {} target(s) processed",
        backup_id,
        octx.touched.len()
    )))
}

fn post_operation(pipeline: &mut GatePipeline, octx: &mut OperationContext) -> Result<GateResult> {
    octx.operation.transition(OperationStatus::Validating)?;

    let failures = post_check_failures(pipeline, octx);
    if failures.is_empty() {
        Ok(GateResult::Pass(format!(
            "{} post-operation check(s) passed",
            pipeline.post_checks.len() + 1
        )))
    } else {
        Err(GuardError::PostValidationFailure(failures.join("; ")))
    }
}
