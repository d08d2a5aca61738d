//! The gated execution pipeline.
//!
//! Every destructive operation runs through six gates in a fixed order:
//!
//! 1. `pre_flight`: structure, protected-path veto, path locks
//! 2. `dependency_analysis`: who references the targets (configurable)
//! 3. `risk_assessment`: score and confirmation requirement
//! 4. `human_confirmation`: challenge/response through a [`Confirmer`]
//! 5. `backup_execute`: snapshot every target, then apply the operation
//! 6. `post_operation`: verify the result (configurable)
//!
//! A refusal before step 5 leaves the filesystem untouched. Any failure
//! from step 5 on, including a panic, restores the backup. Either way the
//! caller gets a [`PipelineOutcome`] rather than an `Err`, so there is
//! always a message and an exit code to report.

mod context;
mod executor;
mod gates;
mod preview;
mod validation;


pub use context::{LogEntry, OperationContext};
pub use executor::{FsExecutor, TargetExecutor};
pub use gates::{Gate, GateResult};
pub use preview::{Preview, PreviewTarget};
pub use validation::PostCheck;

use crate::backup::{BackupStore, RestoreReport};
use crate::config::Config;
use crate::confirm::{Confirmer, DenyAll};
use crate::context::ProjectContext;
use crate::dependency::{DependencyAnalyzer, DependencyReport};
use crate::error::{GuardError, Result};
use crate::events::{Event, OperationEvent, append_event, operation_state};
use crate::fs::path_size;
use crate::locks::acquire_operation_lock;
use crate::operation::{CleanupOperation, ConfirmationLevel, OperationStatus};
use crate::protected::ProtectedPaths;
use crate::risk::RiskAssessment;
use serde_json::{Value, json};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub operation: CleanupOperation,
    pub success: bool,
    pub message: String,
    pub error: Option<GuardError>,
    pub backup_id: Option<String>,
    pub risk: Option<RiskAssessment>,
    pub dependency_report: Option<DependencyReport>,
    pub log: Vec<LogEntry>,
}

impl PipelineOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        self.error
            .as_ref()
            .map_or(crate::exit_codes::SUCCESS, GuardError::exit_code)
    }

    /// Whether the filesystem was left as it was before the run.
    pub fn rolled_back(&self) -> bool {
        self.operation.status == OperationStatus::FailedRolledBack
    }
}

/// Runs cleanup operations for one project.
pub struct GatePipeline {
    ctx: ProjectContext,
    config: Config,
    protected: ProtectedPaths,
    analyzer: DependencyAnalyzer,
    store: BackupStore,
    confirmer: Box<dyn Confirmer>,
    executor: Box<dyn TargetExecutor>,
    post_checks: Vec<(String, PostCheck)>,
}

impl GatePipeline {
    /// Build a pipeline that denies every confirmation and acts on the real
    /// filesystem. Use [`with_confirmer`](Self::with_confirmer) to let a
    /// human (or a standing approval) answer challenges.
    pub fn new(ctx: &ProjectContext, config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            protected: ProtectedPaths::new(ctx, config)?,
            analyzer: DependencyAnalyzer::new(ctx, config),
            store: BackupStore::new(ctx),
            ctx: ctx.clone(),
            config: config.clone(),
            confirmer: Box::new(DenyAll),
            executor: Box::new(FsExecutor),
            post_checks: Vec::new(),
        })
    }

    pub fn with_confirmer(mut self, confirmer: Box<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_executor(mut self, executor: Box<dyn TargetExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Register an extra post-operation check. Checks run in registration
    /// order after the built-in ones.
    pub fn with_post_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&OperationContext) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.post_checks.push((name.into(), Box::new(check)));
        self
    }

    pub fn context(&self) -> &ProjectContext {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backups(&self) -> &BackupStore {
        &self.store
    }

    /// Run `operation` through every gate.
    pub fn run(&mut self, operation: CleanupOperation) -> PipelineOutcome {
        let mut octx = OperationContext::new(operation);
        let operation_id = octx.operation.operation_id.clone();

        info!(
            operation_id = %operation_id,
            operation_type = %octx.operation.operation_type,
            targets = octx.operation.targets.len(),
            "pipeline started"
        );

        if let Err(e) = self.ctx.ensure_state_dirs() {
            return self.reject(octx, e);
        }
        let _operation_lock = match acquire_operation_lock(&self.ctx, &operation_id, "execute") {
            Ok(guard) => guard,
            Err(e) => return self.reject(octx, e),
        };
        self.note_proposed(&octx.operation);

        for gate in Gate::ALL {
            if !gate.enabled(&self.config) {
                octx.note(gate, "skipped", "disabled by configuration");
                continue;
            }

            let result = if gate.is_destructive() {
                match panic::catch_unwind(AssertUnwindSafe(|| gate.validate(self, &mut octx))) {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = format!(
                            "panic during {}: {}; emergency rollback",
                            gate.name(),
                            panic_message(payload.as_ref())
                        );
                        error!(operation_id = %operation_id, "{}", message);
                        let err = if octx.backup.is_some() {
                            GuardError::ExecutionFailure(message)
                        } else {
                            GuardError::BackupFailure(message)
                        };
                        octx.fail(err)
                    }
                }
            } else {
                gate.validate(self, &mut octx)
            };

            info!(
                operation_id = %operation_id,
                gate = gate.name(),
                outcome = result.outcome(),
                "{}",
                result.message()
            );
            octx.record(gate, &result);

            match result {
                GateResult::Pass(_) => {}
                GateResult::RequireConfirmation(level, _) => octx.require(level),
                GateResult::Fail(message) => {
                    let error = octx
                        .error
                        .take()
                        .unwrap_or_else(|| gate.default_error(message));
                    return if octx.backup.is_some() {
                        self.roll_back(octx, error)
                    } else {
                        self.reject(octx, error)
                    };
                }
            }
        }

        self.complete(octx)
    }

    /// Run `operation` and reduce the outcome to `(success, message)`.
    pub fn execute_cleanup_operation(&mut self, operation: CleanupOperation) -> (bool, String) {
        let outcome = self.run(operation);
        (outcome.success, outcome.message)
    }

    /// Restore a backup by id, outside of any pipeline run.
    ///
    /// # Errors
    ///
    /// `UserError` for an unknown backup, `LockError` if the operation is
    /// running, `RollbackFailure` if any entry could not be restored.
    pub fn rollback(&self, backup_id: &str) -> Result<RestoreReport> {
        let manifest = self.store.load(backup_id)?;
        let operation_id = manifest.operation.operation_id.clone();
        let _lock = acquire_operation_lock(&self.ctx, &operation_id, "rollback")?;

        let report = self.store.restore(backup_id)?;
        self.record_event(
            &operation_id,
            OperationEvent::RolledBack,
            None,
            json!({
                "backup_id": backup_id,
                "manual": true,
                "restored": report.restored_count(),
                "failed": report.failures().len(),
            }),
        );
        info!(
            operation_id = %operation_id,
            backup_id,
            restored = report.restored_count(),
            "manual rollback"
        );

        report.ensure_complete()?;
        Ok(report)
    }

    /// [`rollback`](Self::rollback) reduced to `(success, message)`.
    pub fn rollback_operation(&self, backup_id: &str) -> (bool, String) {
        match self.rollback(backup_id) {
            Ok(report) => (
                true,
                format!(
                    "Restored {} path(s) from backup {} (operation {})",
                    report.restored_count(),
                    report.backup_id,
                    report.operation_id
                ),
            ),
            Err(e) => (false, e.to_string()),
        }
    }

    /// Evaluate the non-destructive gates for `operation`.
    ///
    /// Takes no locks, appends no events and changes no files, so repeated
    /// previews of the same operation over the same tree are identical.
    pub fn preview(&self, operation: &CleanupOperation) -> Result<Preview> {
        let mut octx = OperationContext::new(operation.clone());
        let mut gate_lines: Vec<GateLine> = Vec::new();
        let mut blocked = None;

        let mut proceed = push_gate_line(
            &mut gate_lines,
            &mut blocked,
            Gate::PreFlight,
            gates::pre_flight(self, &mut octx, false),
        );

        if proceed {
            if Gate::DependencyAnalysis.enabled(&self.config) {
                let result = gates::dependency_analysis(self, &mut octx);
                if let Ok(GateResult::RequireConfirmation(level, _)) = &result {
                    octx.require(*level);
                }
                proceed = push_gate_line(&mut gate_lines, &mut blocked, Gate::DependencyAnalysis, result);
            } else {
                gate_lines.push((
                    Gate::DependencyAnalysis.name(),
                    "skipped",
                    "disabled by configuration".to_string(),
                ));
            }
        }

        if proceed {
            let result = gates::risk_assessment(self, &mut octx);
            if let Ok(GateResult::RequireConfirmation(level, _)) = &result {
                octx.require(*level);
            }
            proceed = push_gate_line(&mut gate_lines, &mut blocked, Gate::RiskAssessment, result);
        }

        let confirmation_required = self.final_confirmation(octx.required_confirmation);
        let manual_override_required = octx
            .risk
            .as_ref()
            .is_some_and(|r| r.manual_override_required);

        if proceed {
            if manual_override_required && !octx.operation.manual_override {
                let message = "critical risk requires an explicit manual override".to_string();
                gate_lines.push((Gate::HumanConfirmation.name(), "fail", message.clone()));
                blocked = Some(message);
            } else {
                let message = match confirmation_required {
                    ConfirmationLevel::None => "no confirmation required".to_string(),
                    level => format!("would ask for {} confirmation", level),
                };
                gate_lines.push((Gate::HumanConfirmation.name(), "pending", message));
                for gate in [Gate::BackupExecute, Gate::PostOperation] {
                    let outcome = if gate.enabled(&self.config) { "pending" } else { "skipped" };
                    gate_lines.push((gate.name(), outcome, "not run in dry run".to_string()));
                }
            }
        }

        let report = octx.dependency_report.clone().unwrap_or_default();
        let targets = octx
            .operation
            .targets
            .iter()
            .map(|target| PreviewTarget {
                path: self.display_path(target),
                size_bytes: path_size(target),
                referenced_by: report
                    .for_target(target)
                    .iter()
                    .map(|r| self.display_path(r))
                    .collect(),
            })
            .collect();

        Ok(Preview {
            operation_id: octx.operation.operation_id.clone(),
            operation_type: octx.operation.operation_type,
            description: octx.operation.description.clone(),
            targets,
            gates: gate_lines,
            risk: octx.risk.clone(),
            confirmation_required,
            manual_override_required,
            blocked,
        })
    }

    /// Confirmation level after strict mode is applied.
    fn final_confirmation(&self, accumulated: ConfirmationLevel) -> ConfirmationLevel {
        if self.config.strict_mode {
            accumulated.raised()
        } else {
            accumulated
        }
    }

    fn display_path(&self, path: &Path) -> PathBuf {
        self.ctx.relative(path).unwrap_or(path).to_path_buf()
    }

    fn note_proposed(&self, operation: &CleanupOperation) {
        match operation_state(&self.ctx, &operation.operation_id) {
            Ok(Some(_)) => {}
            Ok(None) => self.record_event(
                &operation.operation_id,
                OperationEvent::Proposed,
                None,
                json!({
                    "type": operation.operation_type.as_str(),
                    "targets": operation.targets,
                    "description": operation.description,
                }),
            ),
            Err(e) => warn!(operation_id = %operation.operation_id, "cannot replay events: {}", e),
        }
    }

    fn record_event(
        &self,
        operation_id: &str,
        event: OperationEvent,
        actor: Option<&str>,
        details: Value,
    ) {
        let mut record = Event::new(operation_id, event).with_details(details);
        if let Some(actor) = actor {
            record = record.with_actor(actor);
        }
        self.append(record);
    }

    fn append(&self, event: Event) {
        if let Err(e) = append_event(&self.ctx, &event) {
            warn!(
                operation_id = %event.operation_id,
                event = %event.event,
                "failed to record event: {}",
                e
            );
        }
    }

    /// Refuse before any backup exists. Nothing on disk has changed.
    fn reject(&mut self, mut octx: OperationContext, error: GuardError) -> PipelineOutcome {
        let operation_id = octx.operation.operation_id.clone();
        if let Err(e) = octx.operation.transition(OperationStatus::Rejected) {
            warn!(operation_id = %operation_id, "{}", e);
        }

        let event = if octx.user_denied {
            OperationEvent::UserRejected
        } else {
            OperationEvent::Blocked
        };
        self.record_event(
            &operation_id,
            event,
            None,
            json!({"error": error.kind(), "message": error.to_string()}),
        );

        warn!(operation_id = %operation_id, kind = error.kind(), "operation refused: {}", error);
        let message = format!("Operation {} refused: {}", operation_id, error);
        into_outcome(octx, false, message, Some(error))
    }

    /// Restore the backup after a failure at or past the backup gate.
    fn roll_back(&mut self, mut octx: OperationContext, error: GuardError) -> PipelineOutcome {
        let operation_id = octx.operation.operation_id.clone();
        let backup_id = octx.backup_id().unwrap_or_default().to_string();
        warn!(
            operation_id = %operation_id,
            backup_id = %backup_id,
            "{}; rolling back",
            error
        );

        let incomplete = match self.store.restore(&backup_id) {
            Ok(report) => report.ensure_complete().err().map(|e| (e, report.restored_count())),
            Err(e) => Some((e, 0)),
        };

        let (final_error, restored) = match incomplete {
            None => (error, octx.backup.as_ref().map_or(0, |b| b.files.len())),
            Some((rollback_error, restored)) => {
                error!(
                    operation_id = %operation_id,
                    backup_id = %backup_id,
                    "rollback incomplete: {}",
                    rollback_error
                );
                if self.config.auto_rollback_on_failure {
                    (
                        GuardError::RollbackFailure(format!(
                            "{} (after: {})",
                            rollback_error, error
                        )),
                        restored,
                    )
                } else {
                    (error.with_note(&rollback_error.to_string()), restored)
                }
            }
        };

        if let Err(e) = octx.operation.transition(OperationStatus::FailedRolledBack) {
            warn!(operation_id = %operation_id, "{}", e);
        }
        self.record_event(
            &operation_id,
            OperationEvent::RolledBack,
            None,
            json!({
                "backup_id": backup_id,
                "error": final_error.kind(),
                "message": final_error.to_string(),
                "restored": restored,
            }),
        );

        let message = match final_error {
            GuardError::RollbackFailure(_) => format!(
                "Operation {} failed and restoring backup {} was incomplete: {}",
                operation_id, backup_id, final_error
            ),
            _ => format!(
                "Operation {} failed and was rolled back from backup {}: {}",
                operation_id, backup_id, final_error
            ),
        };
        into_outcome(octx, false, message, Some(final_error))
    }

    fn complete(&mut self, mut octx: OperationContext) -> PipelineOutcome {
        let operation_id = octx.operation.operation_id.clone();
        // With post-validation disabled the operation is still `executing`.
        let steps: &[OperationStatus] = if octx.operation.status == OperationStatus::Executing {
            &[OperationStatus::Validating, OperationStatus::Completed]
        } else {
            &[OperationStatus::Completed]
        };
        for &next in steps {
            if let Err(e) = octx.operation.transition(next) {
                warn!(operation_id = %operation_id, "{}", e);
            }
        }

        let backup_id = octx.backup_id().unwrap_or_default().to_string();
        let mut event = Event::new(&operation_id, OperationEvent::Executed).with_details(json!({
            "backup_id": backup_id,
            "type": octx.operation.operation_type.as_str(),
            "targets": octx.touched,
            "confirmed_by": octx.operation.confirmed_by,
        }));
        if let Some(risk) = &octx.risk {
            event = event.with_risk_assessment(risk.clone());
        }
        self.append(event);

        info!(operation_id = %operation_id, backup_id = %backup_id, "operation completed");
        let message = format!(
            "Operation {} completed: {} {} target(s); backup {}",
            operation_id,
            octx.operation.operation_type,
            octx.touched.len(),
            backup_id
        );
        into_outcome(octx, true, message, None)
    }
}

type GateLine = (&'static str, &'static str, String);

/// Record a dry-run gate result; `false` once the gate refused.
fn push_gate_line(
    lines: &mut Vec<GateLine>,
    blocked: &mut Option<String>,
    gate: Gate,
    result: Result<GateResult>,
) -> bool {
    match result {
        Ok(result) => {
            lines.push((gate.name(), result.outcome(), result.message().to_string()));
            true
        }
        Err(e) => {
            lines.push((gate.name(), "fail", e.to_string()));
            *blocked = Some(e.to_string());
            false
        }
    }
}

fn into_outcome(
    octx: OperationContext,
    success: bool,
    message: String,
    error: Option<GuardError>,
) -> PipelineOutcome {
    PipelineOutcome {
        backup_id: octx.backup.as_ref().map(|b| b.backup_id.clone()),
        operation: octx.operation,
        success,
        message,
        error,
        risk: octx.risk,
        dependency_report: octx.dependency_report,
        log: octx.log,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one operation with a fresh pipeline.
pub fn execute_cleanup_operation(
    ctx: &ProjectContext,
    config: &Config,
    operation: CleanupOperation,
    confirmer: Box<dyn Confirmer>,
) -> (bool, String) {
    match GatePipeline::new(ctx, config) {
        Ok(pipeline) => pipeline
            .with_confirmer(confirmer)
            .execute_cleanup_operation(operation),
        Err(e) => (false, e.to_string()),
    }
}

/// Restore a backup with a fresh pipeline.
pub fn rollback_operation(ctx: &ProjectContext, config: &Config, backup_id: &str) -> (bool, String) {
    match GatePipeline::new(ctx, config) {
        Ok(pipeline) => pipeline.rollback_operation(backup_id),
        Err(e) => (false, e.to_string()),
    }
}
