//! Error types for sweepguard.
//!
//! Uses thiserror for derive macros. Each variant is one class of pipeline
//! outcome and maps to its own exit code, so a caller can tell "nothing
//! happened" apart from "something happened and was undone".

use crate::exit_codes;
use thiserror::Error;

/// Main error type for sweepguard operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Invalid arguments, invalid state, or an I/O failure outside the pipeline.
    #[error("{0}")]
    UserError(String),

    /// The operation targets a protected path or is otherwise disallowed.
    /// No backup exists and nothing was touched.
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// Confirmation was denied, timed out, or cancelled. No backup exists.
    #[error("Unconfirmed risk: {0}")]
    UnconfirmedRisk(String),

    /// A path or operation lock is held by another operation.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// Targets could not be snapshotted; nothing destructive was attempted.
    #[error("Backup failed: {0}")]
    BackupFailure(String),

    /// A destructive step failed mid-operation; the backup was restored.
    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    /// The operation completed mechanically but post-validation failed;
    /// the backup was restored.
    #[error("Post-validation failed: {0}")]
    PostValidationFailure(String),

    /// Restoring from backup failed for one or more files.
    #[error("Rollback failed: {0}")]
    RollbackFailure(String),
}

impl GuardError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GuardError::UserError(_) => exit_codes::USER_ERROR,
            GuardError::PolicyViolation(_) => exit_codes::POLICY_VIOLATION,
            GuardError::UnconfirmedRisk(_) => exit_codes::UNCONFIRMED_RISK,
            GuardError::LockError(_) => exit_codes::LOCK_FAILURE,
            GuardError::BackupFailure(_) => exit_codes::BACKUP_FAILURE,
            GuardError::ExecutionFailure(_) | GuardError::PostValidationFailure(_) => {
                exit_codes::ROLLED_BACK
            }
            GuardError::RollbackFailure(_) => exit_codes::ROLLBACK_FAILURE,
        }
    }

    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            GuardError::UserError(_) => "user_error",
            GuardError::PolicyViolation(_) => "policy_violation",
            GuardError::UnconfirmedRisk(_) => "unconfirmed_risk",
            GuardError::LockError(_) => "lock_error",
            GuardError::BackupFailure(_) => "backup_failure",
            GuardError::ExecutionFailure(_) => "execution_failure",
            GuardError::PostValidationFailure(_) => "post_validation_failure",
            GuardError::RollbackFailure(_) => "rollback_failure",
        }
    }

    /// Whether this error was raised before any backup existed.
    ///
    /// Such failures are guaranteed to have had no filesystem side effects
    /// on the targets.
    /// Same error class, message extended with `note`.
    pub fn with_note(self, note: &str) -> Self {
        match self {
            GuardError::UserError(m) => GuardError::UserError(format!("{}; {}", m, note)),
            GuardError::PolicyViolation(m) => {
                GuardError::PolicyViolation(format!("{}; {}", m, note))
            }
            GuardError::UnconfirmedRisk(m) => {
                GuardError::UnconfirmedRisk(format!("{}; {}", m, note))
            }
            GuardError::LockError(m) => GuardError::LockError(format!("{}; {}", m, note)),
            GuardError::BackupFailure(m) => GuardError::BackupFailure(format!("{}; {}", m, note)),
            GuardError::ExecutionFailure(m) => {
                GuardError::ExecutionFailure(format!("{}; {}", m, note))
            }
            GuardError::PostValidationFailure(m) => {
                GuardError::PostValidationFailure(format!("{}; {}", m, note))
            }
            GuardError::RollbackFailure(m) => {
                GuardError::RollbackFailure(format!("{}; {}", m, note))
            }
        }
    }

    pub fn is_pre_backup(&self) -> bool {
        matches!(
            self,
            GuardError::UserError(_)
                | GuardError::PolicyViolation(_)
                | GuardError::UnconfirmedRisk(_)
                | GuardError::LockError(_)
                | GuardError::BackupFailure(_)
        )
    }
}

/// Result type alias for sweepguard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
