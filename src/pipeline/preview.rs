//! Dry-run report.

use crate::operation::{ConfirmationLevel, OperationType};
use crate::risk::RiskAssessment;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewTarget {
    /// Project-relative path.
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Project-relative files that reference this target.
    pub referenced_by: Vec<PathBuf>,
}

/// What a run would do, computed without locks, events or file changes.
///
/// Rendering the same operation against an unchanged tree gives the same text.
/// The operation id is left out of the rendering since every build of an
/// operation gets a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub operation_id: String,
    pub operation_type: OperationType,
    pub description: String,
    pub targets: Vec<PreviewTarget>,
    /// `(gate, outcome, message)` for every gate considered.
    pub gates: Vec<(&'static str, &'static str, String)>,
    pub risk: Option<RiskAssessment>,
    pub confirmation_required: ConfirmationLevel,
    pub manual_override_required: bool,
    /// Why the run would be refused before backup, if it would.
    pub blocked: Option<String>,
}

impl Preview {
    pub fn would_proceed(&self) -> bool {
        self.blocked.is_none()
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Dry run: {} ({})",
            self.operation_type, self.description
        )?;

        writeln!(f, "Targets:")?;
        for target in &self.targets {
            writeln!(f, "  {} ({} bytes)", target.path.display(), target.size_bytes)?;
            for referrer in &target.referenced_by {
                writeln!(f, "    referenced by {}", referrer.display())?;
            }
        }

        writeln!(f, "Gates:")?;
        for (gate, outcome, message) in &self.gates {
            writeln!(f, "  {:<20} {:<8} {}", gate, outcome, message)?;
        }

        if let Some(risk) = &self.risk {
            writeln!(f, "Risk: {} (score {:.1})", risk.level, risk.score)?;
        }
        writeln!(f, "Confirmation: {}", self.confirmation_required)?;
        if self.manual_override_required {
            writeln!(f, "Manual override: required")?;
        }

        match &self.blocked {
            Some(reason) => write!(f, "Result: blocked: {}", reason),
            None => write!(f, "Result: would proceed"),
        }
    }
}
