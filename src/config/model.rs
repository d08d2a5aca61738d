//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a sweepguard project.
///
/// This struct represents the contents of `.sweepguard/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Gate policy
    // =========================================================================
    /// Raise every confirmation requirement by one step (none→simple→complex).
    #[serde(default)]
    pub strict_mode: bool,

    /// Require a simple confirmation for `medium` risk operations.
    ///
    /// When false, medium-risk operations without dependents skip confirmation.
    #[serde(default = "default_true")]
    pub require_confirmation_for_medium_risk: bool,

    /// Treat a failed restore as a hard `RollbackFailure`.
    ///
    /// When false, restore is still attempted but its failures are reported
    /// as part of the original error rather than escalating it.
    #[serde(default = "default_true")]
    pub auto_rollback_on_failure: bool,

    /// Run the dependency analysis gate.
    #[serde(default = "default_true")]
    pub dependency_analysis: bool,

    /// Run the post-operation validation gate.
    #[serde(default = "default_true")]
    pub post_validation: bool,

    // =========================================================================
    // Confirmation
    // =========================================================================
    /// Base timeout for a confirmation response.
    #[serde(default = "default_confirmation_timeout_seconds")]
    pub confirmation_timeout_seconds: u64,

    /// Upper bound for the scaled confirmation timeout.
    #[serde(default = "default_max_confirmation_timeout_seconds")]
    pub max_confirmation_timeout_seconds: u64,

    // =========================================================================
    // Paths and analysis
    // =========================================================================
    /// Extra protected glob patterns (added to the built-in list).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected_patterns: Vec<String>,

    /// File extensions searched by the dependency analyzer (no leading dots).
    #[serde(default = "default_dependency_extensions")]
    pub dependency_extensions: Vec<String>,

    /// Files larger than this are not searched for references.
    #[serde(default = "default_max_dependency_file_bytes")]
    pub max_dependency_file_bytes: u64,

    /// Maximum number of candidates reported by `scan`.
    #[serde(default = "default_scan_max_files")]
    pub scan_max_files: usize,

    // =========================================================================
    // Retention and locks
    // =========================================================================
    /// Backups older than this are eligible for pruning.
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u32,

    /// Minutes after which a lock is reported as stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_mode: false,
            require_confirmation_for_medium_risk: default_true(),
            auto_rollback_on_failure: default_true(),
            dependency_analysis: default_true(),
            post_validation: default_true(),
            confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
            max_confirmation_timeout_seconds: default_max_confirmation_timeout_seconds(),
            protected_patterns: Vec::new(),
            dependency_extensions: default_dependency_extensions(),
            max_dependency_file_bytes: default_max_dependency_file_bytes(),
            scan_max_files: default_scan_max_files(),
            backup_retention_days: default_backup_retention_days(),
            lock_stale_minutes: default_lock_stale_minutes(),
        }
    }
}
