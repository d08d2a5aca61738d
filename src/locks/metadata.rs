//! What a lock file says about its holder.

use crate::error::{GuardError, Result};
use crate::events::get_actor_string;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// JSON body of an operation or path lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// `user@HOST` of the holder.
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// `execute` or `rollback`.
    pub action: String,

    pub operation_id: String,

    /// Canonical target path; only set on path locks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

impl LockMetadata {
    /// Metadata for the current process, stamped now.
    pub fn new(action: &str, operation_id: &str) -> Self {
        Self {
            owner: get_actor_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
            operation_id: operation_id.to_string(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: &Path) -> Self {
        self.target = Some(target.to_path_buf());
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parse_error = |what: &str, e: &dyn std::fmt::Display| {
            GuardError::UserError(format!(
                "failed to {} lock file '{}': {}",
                what,
                path.display(),
                e
            ))
        };

        let content = std::fs::read_to_string(path).map_err(|e| parse_error("read", &e))?;
        serde_json::from_str(&content).map_err(|e| parse_error("parse", &e))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            GuardError::UserError(format!("failed to serialize lock metadata: {}", e))
        })
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Age as `3d 4h`, `2h 15m` or `7m`.
    pub fn age_string(&self) -> String {
        let age = self.age();
        match (age.num_days(), age.num_hours() % 24, age.num_minutes() % 60) {
            (0, 0, minutes) => format!("{}m", minutes.max(0)),
            (0, hours, minutes) => format!("{}h {}m", hours, minutes),
            (days, hours, _) => format!("{}d {}h", days, hours),
        }
    }

    /// Older than `stale_minutes`; a holder this old has most likely crashed.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > i64::from(stale_minutes)
    }
}
