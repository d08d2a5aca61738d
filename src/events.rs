//! Operation event log.
//!
//! Append-only NDJSON log at `.sweepguard/events/operations.ndjson`. The log
//! is the source of truth for operation state: rather than trusting a
//! mutable status field in a proposal file, readers replay the events for an
//! operation id and fold them into an [`OperationState`].
//!
//! # Event Format
//!
//! Each line is a JSON object with the following fields:
//! - `operation_id`: the operation the event belongs to
//! - `event`: one of `proposed`, `user_approved`, `user_rejected`,
//!   `executed`, `rolled_back`, `blocked`
//! - `timestamp`: RFC3339 timestamp
//! - `actor`: who caused the event (e.g., `user@HOST`)
//! - `risk_assessment`: optional assessment attached by the pipeline
//! - `details`: freeform object with event-specific details
//!
//! # Usage
//!
//! ```no_run
//! use sweepguard::context::ProjectContext;
//! use sweepguard::events::{Event, OperationEvent, append_event, is_approved};
//!
//! let ctx = ProjectContext::resolve()?;
//! append_event(&ctx, &Event::new("op-1", OperationEvent::UserApproved))?;
//! assert!(is_approved(&ctx, "op-1")?);
//! # Ok::<(), sweepguard::error::GuardError>(())
//! ```

use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::warn;

/// Kinds of events recorded for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationEvent {
    /// Operation assembled (by the proposal builder or a direct caller).
    Proposed,
    /// A human approved the operation or passed its confirmation challenge.
    UserApproved,
    /// A human rejected the operation, or confirmation was denied/timed out.
    UserRejected,
    /// The operation completed and post-validation passed.
    Executed,
    /// The operation failed after backup and was restored.
    RolledBack,
    /// A gate refused the operation before any backup existed.
    Blocked,
}

impl std::fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationEvent::Proposed => write!(f, "proposed"),
            OperationEvent::UserApproved => write!(f, "user_approved"),
            OperationEvent::UserRejected => write!(f, "user_rejected"),
            OperationEvent::Executed => write!(f, "executed"),
            OperationEvent::RolledBack => write!(f, "rolled_back"),
            OperationEvent::Blocked => write!(f, "blocked"),
        }
    }
}

/// One record of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub operation_id: String,

    pub event: OperationEvent,

    pub timestamp: DateTime<Utc>,

    /// The actor who caused the event (e.g., `user@HOST`).
    pub actor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,

    /// Freeform details object with event-specific information.
    #[serde(default)]
    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and local actor.
    pub fn new(operation_id: impl Into<String>, event: OperationEvent) -> Self {
        Self {
            operation_id: operation_id.into(),
            event,
            timestamp: Utc::now(),
            actor: get_actor_string(),
            risk_assessment: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Override the actor (e.g. the name passed to `--by`).
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_risk_assessment(mut self, assessment: RiskAssessment) -> Self {
        self.risk_assessment = Some(assessment);
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            GuardError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Get the actor string for event metadata.
pub fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the log.
///
/// The record and its trailing newline go out in a single `write` on a file
/// opened in append mode, so concurrent appenders never interleave within a
/// line. The file is synced before returning.
pub fn append_event(ctx: &ProjectContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();

    let mut line = event.to_ndjson_line()?;
    line.push('\n');

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            GuardError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            GuardError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    file.write_all(line.as_bytes()).map_err(|e| {
        GuardError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        GuardError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })
}

/// Read every well-formed event in log order.
///
/// A missing log is an empty history. Malformed lines (e.g. a torn final
/// line after a crash) are skipped with a warning.
pub fn read_events(ctx: &ProjectContext) -> Result<Vec<Event>> {
    let events_file = ctx.events_file();
    let content = match fs::read_to_string(&events_file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(GuardError::UserError(format!(
                "failed to read events file '{}': {}",
                events_file.display(),
                e
            )));
        }
    };

    let mut events = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(line = idx + 1, error = %e, "skipping malformed event"),
        }
    }

    Ok(events)
}

/// State of an operation as reconstructed from its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayedStatus {
    Proposed,
    Approved,
    Rejected,
    Executed,
    RolledBack,
    /// Refused by a gate; an approved operation may be retried.
    Blocked,
}

impl ReplayedStatus {
    /// No further event can change the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplayedStatus::Rejected | ReplayedStatus::Executed | ReplayedStatus::RolledBack
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayedStatus::Proposed => "proposed",
            ReplayedStatus::Approved => "approved",
            ReplayedStatus::Rejected => "rejected",
            ReplayedStatus::Executed => "executed",
            ReplayedStatus::RolledBack => "rolled_back",
            ReplayedStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for ReplayedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folded view of one operation's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationState {
    pub operation_id: String,
    pub status: ReplayedStatus,
    /// Whether a `user_approved` event stands (not superseded by a rejection).
    pub approved: bool,
    pub last_actor: String,
    pub last_event_at: DateTime<Utc>,
    pub event_count: usize,
}

impl OperationState {
    fn apply(&mut self, event: &Event) {
        match event.event {
            OperationEvent::Proposed => self.status = ReplayedStatus::Proposed,
            OperationEvent::UserApproved => {
                self.status = ReplayedStatus::Approved;
                self.approved = true;
            }
            OperationEvent::UserRejected => {
                self.status = ReplayedStatus::Rejected;
                self.approved = false;
            }
            OperationEvent::Executed => self.status = ReplayedStatus::Executed,
            OperationEvent::RolledBack => self.status = ReplayedStatus::RolledBack,
            OperationEvent::Blocked => self.status = ReplayedStatus::Blocked,
        }
        self.last_actor = event.actor.clone();
        self.last_event_at = event.timestamp;
        self.event_count += 1;
    }

    /// Approved and not yet finished.
    pub fn is_approved(&self) -> bool {
        self.approved && !self.status.is_terminal()
    }
}

/// Fold a sequence of events into per-operation state.
///
/// Once an operation reaches a terminal status, later events for it are
/// ignored.
pub fn fold_events(events: &[Event]) -> BTreeMap<String, OperationState> {
    let mut states: BTreeMap<String, OperationState> = BTreeMap::new();

    for event in events {
        let state = states
            .entry(event.operation_id.clone())
            .or_insert_with(|| OperationState {
                operation_id: event.operation_id.clone(),
                status: ReplayedStatus::Proposed,
                approved: false,
                last_actor: event.actor.clone(),
                last_event_at: event.timestamp,
                event_count: 0,
            });

        if state.event_count > 0 && state.status.is_terminal() {
            continue;
        }
        state.apply(event);
    }

    states
}

/// Replay the whole log.
pub fn replay(ctx: &ProjectContext) -> Result<BTreeMap<String, OperationState>> {
    Ok(fold_events(&read_events(ctx)?))
}

/// Replayed state of one operation, or `None` if it has no events.
pub fn operation_state(ctx: &ProjectContext, operation_id: &str) -> Result<Option<OperationState>> {
    Ok(replay(ctx)?.remove(operation_id))
}

/// Whether `operation_id` has a standing approval and has not finished.
pub fn is_approved(ctx: &ProjectContext, operation_id: &str) -> Result<bool> {
    Ok(operation_state(ctx, operation_id)?.is_some_and(|s| s.is_approved()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestProject;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = Event::new("op-1", OperationEvent::Proposed);

        assert_eq!(event.event, OperationEvent::Proposed);
        assert_eq!(event.operation_id, "op-1");
        assert!(event.actor.contains('@'));
        assert!(event.risk_assessment.is_none());
        let age = Utc::now().signed_duration_since(event.timestamp);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_serialization_is_single_line() {
        let event = Event::new("op-1", OperationEvent::UserApproved)
            .with_actor("alice")
            .with_details(json!({"note": "looks fine"}));

        let line = event.to_ndjson_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"user_approved\""));
        assert!(!line.contains("risk_assessment"));

        let parsed: Event = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.actor, "alice");
        assert_eq!(parsed.details["note"], "looks fine");
    }

    #[test]
    fn test_append_and_read_events() {
        let project = TestProject::new();

        append_event(&project.ctx, &Event::new("op-1", OperationEvent::Proposed)).unwrap();
        append_event(&project.ctx, &Event::new("op-1", OperationEvent::UserApproved)).unwrap();

        let content = fs::read_to_string(project.ctx.events_file()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let events = read_events(&project.ctx).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event, OperationEvent::UserApproved);
    }

    #[test]
    fn test_read_events_missing_log_is_empty() {
        let project = TestProject::new();
        assert!(read_events(&project.ctx).unwrap().is_empty());
    }

    #[test]
    fn test_read_events_skips_torn_line() {
        let project = TestProject::new();
        append_event(&project.ctx, &Event::new("op-1", OperationEvent::Proposed)).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(project.ctx.events_file())
            .unwrap();
        file.write_all(b"{\"operation_id\":\"op-1\",\"ev").unwrap();

        assert_eq!(read_events(&project.ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_replay_approval_flow() {
        let project = TestProject::new();
        let ctx = &project.ctx;

        append_event(ctx, &Event::new("op-1", OperationEvent::Proposed)).unwrap();
        assert!(!is_approved(ctx, "op-1").unwrap());

        append_event(ctx, &Event::new("op-1", OperationEvent::UserApproved)).unwrap();
        assert!(is_approved(ctx, "op-1").unwrap());

        append_event(ctx, &Event::new("op-1", OperationEvent::Executed)).unwrap();
        let state = operation_state(ctx, "op-1").unwrap().unwrap();
        assert_eq!(state.status, ReplayedStatus::Executed);
        assert!(!state.is_approved());
        assert_eq!(state.event_count, 3);
    }

    #[test]
    fn test_rejection_supersedes_approval() {
        let project = TestProject::new();
        let ctx = &project.ctx;

        append_event(ctx, &Event::new("op-2", OperationEvent::UserApproved)).unwrap();
        append_event(ctx, &Event::new("op-2", OperationEvent::UserRejected)).unwrap();

        assert!(!is_approved(ctx, "op-2").unwrap());
        assert!(operation_state(ctx, "op-3").unwrap().is_none());
    }

    #[test]
    fn test_blocked_approved_operation_can_retry() {
        let project = TestProject::new();
        let ctx = &project.ctx;

        append_event(ctx, &Event::new("op-4", OperationEvent::UserApproved)).unwrap();
        append_event(ctx, &Event::new("op-4", OperationEvent::Blocked)).unwrap();

        let state = operation_state(ctx, "op-4").unwrap().unwrap();
        assert_eq!(state.status, ReplayedStatus::Blocked);
        assert!(state.is_approved());
    }

    #[test]
    fn test_terminal_state_ignores_later_events() {
        let events = vec![
            Event::new("op-5", OperationEvent::UserRejected),
            Event::new("op-5", OperationEvent::UserApproved),
        ];

        let states = fold_events(&events);
        assert_eq!(states["op-5"].status, ReplayedStatus::Rejected);
        assert!(!states["op-5"].is_approved());
    }

    #[test]
    fn test_replay_keys_by_operation() {
        let events = vec![
            Event::new("a", OperationEvent::Proposed),
            Event::new("b", OperationEvent::Proposed),
            Event::new("a", OperationEvent::UserApproved),
        ];

        let states = fold_events(&events);
        assert_eq!(states.len(), 2);
        assert_eq!(states["a"].status, ReplayedStatus::Approved);
        assert_eq!(states["b"].status, ReplayedStatus::Proposed);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(OperationEvent::RolledBack.to_string(), "rolled_back");
        assert_eq!(OperationEvent::Blocked.to_string(), "blocked");
    }
}
