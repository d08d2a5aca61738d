//! Per-run state threaded through the gates.

use super::gates::{Gate, GateResult};
use crate::backup::BackupManifest;
use crate::dependency::DependencyReport;
use crate::error::GuardError;
use crate::locks::PathLockSet;
use crate::operation::{CleanupOperation, ConfirmationLevel};
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// One line of an operation's execution log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub gate: &'static str,
    pub outcome: &'static str,
    pub message: String,
}

/// Everything the gates learn about one operation during a run.
#[derive(Debug)]
pub struct OperationContext {
    pub operation: CleanupOperation,
    pub dependency_report: Option<DependencyReport>,
    pub risk: Option<RiskAssessment>,
    /// Strictest confirmation demanded by any gate so far.
    pub required_confirmation: ConfirmationLevel,
    pub backup: Option<BackupManifest>,
    /// Protected entries that existed next to the targets before the run.
    pub protected_before: Vec<PathBuf>,
    /// Targets the executor has acted on, in order.
    pub touched: Vec<PathBuf>,
    pub log: Vec<LogEntry>,
    /// Set when a human explicitly declined or let the challenge lapse.
    pub user_denied: bool,
    /// Specific error for the next `Fail`, overriding the gate default.
    pub(super) error: Option<GuardError>,
    pub(super) path_locks: Option<PathLockSet>,
}

impl OperationContext {
    pub fn new(operation: CleanupOperation) -> Self {
        Self {
            operation,
            dependency_report: None,
            risk: None,
            required_confirmation: ConfirmationLevel::None,
            backup: None,
            protected_before: Vec::new(),
            touched: Vec::new(),
            log: Vec::new(),
            user_denied: false,
            error: None,
            path_locks: None,
        }
    }

    /// Raise the confirmation requirement to at least `level`.
    pub fn require(&mut self, level: ConfirmationLevel) {
        self.required_confirmation = self.required_confirmation.max(level);
    }

    /// Append a gate result to the execution log.
    pub fn record(&mut self, gate: Gate, result: &GateResult) {
        self.note(gate, result.outcome(), result.message());
    }

    pub fn note(&mut self, gate: Gate, outcome: &'static str, message: impl Into<String>) {
        self.log.push(LogEntry {
            at: Utc::now(),
            gate: gate.name(),
            outcome,
            message: message.into(),
        });
    }

    /// Fail the current gate with a specific error.
    pub(super) fn fail(&mut self, error: GuardError) -> GateResult {
        let message = error.to_string();
        self.error = Some(error);
        GateResult::Fail(message)
    }

    pub fn backup_id(&self) -> Option<&str> {
        self.backup.as_ref().map(|b| b.backup_id.as_str())
    }
}
