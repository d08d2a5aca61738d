//! Core data model: cleanup targets, operations and their lifecycle.
//!
//! A `CleanupOperation` is created by a front-end (direct submission or the
//! proposal builder) and afterwards mutated only by the gate pipeline, which
//! drives it through `OperationStatus` using checked transitions.

use crate::error::{GuardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Coarse ordinal risk tier.
///
/// Discovery (the scanner) uses the whole range; a `RiskAssessment` never
/// goes below `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Parse a risk level from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much deliberate effort a confirmation demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationLevel {
    None,
    Simple,
    Complex,
}

impl ConfirmationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationLevel::None => "none",
            ConfirmationLevel::Simple => "simple",
            ConfirmationLevel::Complex => "complex",
        }
    }

    /// One step stricter (`Complex` stays `Complex`).
    pub fn raised(self) -> Self {
        match self {
            ConfirmationLevel::None => ConfirmationLevel::Simple,
            ConfirmationLevel::Simple | ConfirmationLevel::Complex => ConfirmationLevel::Complex,
        }
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the operation does to each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Remove the target (file or directory tree).
    Delete,
    /// Relocate the target under the operation's destination directory.
    Move,
    /// Replace the target file's content with the operation's replacement.
    Modify,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Delete => "delete",
            OperationType::Move => "move",
            OperationType::Modify => "modify",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "move" => Some(Self::Move),
            "modify" => Some(Self::Modify),
            _ => None,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an operation.
///
/// `Completed`, `Rejected` and `FailedRolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Proposed,
    AwaitingConfirmation,
    Confirmed,
    BackingUp,
    Executing,
    Validating,
    Completed,
    Rejected,
    FailedRolledBack,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Proposed => "proposed",
            OperationStatus::AwaitingConfirmation => "awaiting_confirmation",
            OperationStatus::Confirmed => "confirmed",
            OperationStatus::BackingUp => "backing_up",
            OperationStatus::Executing => "executing",
            OperationStatus::Validating => "validating",
            OperationStatus::Completed => "completed",
            OperationStatus::Rejected => "rejected",
            OperationStatus::FailedRolledBack => "failed_rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed
                | OperationStatus::Rejected
                | OperationStatus::FailedRolledBack
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Rejected` is only reachable before a backup exists;
    /// `FailedRolledBack` only after.
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        match (self, next) {
            (Proposed, AwaitingConfirmation | Confirmed | Rejected) => true,
            (AwaitingConfirmation, Confirmed | Rejected) => true,
            (Confirmed, BackingUp | Rejected) => true,
            (BackingUp, Executing | Rejected | FailedRolledBack) => true,
            (Executing, Validating | FailedRolledBack) => true,
            (Validating, Completed | FailedRolledBack) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category assigned to a discovered target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    Cache,
    Temp,
    BuildArtifact,
    Log,
    BackupFile,
    Editor,
    OsMetadata,
    Source,
    Protected,
    Other,
}

impl TargetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetCategory::Cache => "cache",
            TargetCategory::Temp => "temp",
            TargetCategory::BuildArtifact => "build_artifact",
            TargetCategory::Log => "log",
            TargetCategory::BackupFile => "backup_file",
            TargetCategory::Editor => "editor",
            TargetCategory::OsMetadata => "os_metadata",
            TargetCategory::Source => "source",
            TargetCategory::Protected => "protected",
            TargetCategory::Other => "other",
        }
    }
}

impl fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate discovered by the scanner. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupTarget {
    /// Absolute path of the file or directory.
    pub path: PathBuf,
    pub size_bytes: u64,
    pub risk_level: RiskLevel,
    /// Human-readable classification reason.
    pub reason: String,
    pub category: TargetCategory,
}

/// A requested destructive change over an ordered set of paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupOperation {
    pub operation_id: String,
    pub operation_type: OperationType,
    /// Non-empty, duplicate-free, in execution order.
    pub targets: Vec<PathBuf>,
    pub description: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Discovery risk per target, when the operation came from a scan.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target_risk: BTreeMap<PathBuf, RiskLevel>,

    /// Destination directory for `move` operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    /// New content for `modify` operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    /// Explicit human override, required to run `critical` operations.
    #[serde(default)]
    pub manual_override: bool,
}

impl CleanupOperation {
    /// Create a new operation in the `proposed` state.
    ///
    /// # Errors
    ///
    /// `PolicyViolation` if `targets` is empty or contains duplicates.
    pub fn new(
        operation_type: OperationType,
        targets: Vec<PathBuf>,
        description: impl Into<String>,
    ) -> Result<Self> {
        validate_targets(&targets)?;

        Ok(Self {
            operation_id: generate_operation_id(),
            operation_type,
            targets,
            description: description.into(),
            status: OperationStatus::Proposed,
            confirmed_by: None,
            created_at: Utc::now(),
            target_risk: BTreeMap::new(),
            destination: None,
            replacement: None,
            manual_override: false,
        })
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    pub fn with_manual_override(mut self, manual_override: bool) -> Self {
        self.manual_override = manual_override;
        self
    }

    pub fn with_target_risk(mut self, target_risk: BTreeMap<PathBuf, RiskLevel>) -> Self {
        self.target_risk = target_risk;
        self
    }

    /// Discovery risk recorded for `path`, if any.
    pub fn discovery_risk(&self, path: &Path) -> Option<RiskLevel> {
        self.target_risk.get(path).copied()
    }

    /// Where a `move` puts `target`: `<destination>/<file name>`, with the
    /// destination defaulting to `default_destination`. `None` for other types.
    pub fn moved_path(&self, target: &Path, default_destination: &Path) -> Option<PathBuf> {
        if self.operation_type != OperationType::Move {
            return None;
        }
        let destination = self.destination.as_deref().unwrap_or(default_destination);
        let name = target.file_name()?;
        Some(destination.join(name))
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: OperationStatus) -> Result<()> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(GuardError::UserError(format!(
                "operation {}: illegal status transition {} -> {}",
                self.operation_id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Re-check the target list after it has been edited.
    pub fn validate_targets(&self) -> Result<()> {
        validate_targets(&self.targets)
    }
}

fn validate_targets(targets: &[PathBuf]) -> Result<()> {
    if targets.is_empty() {
        return Err(GuardError::PolicyViolation(
            "operation has no targets".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target) {
            return Err(GuardError::PolicyViolation(format!(
                "duplicate target: {}",
                target.display()
            )));
        }
    }

    Ok(())
}

/// Generate an operation id: `op-YYYYMMDD-HHMMSS-xxxxxxxx`.
pub fn generate_operation_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("op-{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &suffix[..8])
}
