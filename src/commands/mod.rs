//! Command implementations for sweepguard.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every handler takes an explicit project context and
//! config so it can be exercised against a temporary project in tests.

mod backups;
mod config_cmd;
mod execute;
mod lock;
mod scan;
mod status;
mod test_run;


use crate::cli::{Cli, Command, LockAction, OperationKind, RiskCeiling};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::operation::{OperationType, RiskLevel};
use crate::pipeline::PipelineOutcome;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. The project is
/// resolved once here and handed to each handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let (ctx, config) = open_project(cli.project_root.as_deref())?;

    match cli.command {
        Command::Test(args) => test_run::cmd_test(&ctx, &config, args),
        Command::ListBackups(args) => backups::cmd_list_backups(&ctx, args),
        Command::Rollback(args) => backups::cmd_rollback(&ctx, &config, args),
        Command::CleanBackups(args) => backups::cmd_clean_backups(&ctx, &config, args),
        Command::Config(args) => config_cmd::cmd_config(&ctx, args),
        Command::Status => status::cmd_status(&ctx, &config),
        Command::Scan(args) => scan::cmd_scan(&ctx, &config, args),
        Command::Propose(args) => scan::cmd_propose(&ctx, args),
        Command::Execute(args) => execute::cmd_execute(&ctx, &config, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(&ctx, &config),
            LockAction::Clear(args) => lock::cmd_lock_clear(&ctx, &config, args),
        },
    }
}

/// Resolve the project and load its config (defaults if none is saved).
pub(crate) fn open_project(project_root: Option<&Path>) -> Result<(ProjectContext, Config)> {
    let ctx = match project_root {
        Some(root) => ProjectContext::for_root(root)?,
        None => ProjectContext::resolve()?,
    };
    let config = Config::load_or_default(ctx.config_path())?;
    Ok((ctx, config))
}

impl From<OperationKind> for OperationType {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Delete => OperationType::Delete,
            OperationKind::Move => OperationType::Move,
            OperationKind::Modify => OperationType::Modify,
        }
    }
}

impl From<RiskCeiling> for RiskLevel {
    fn from(ceiling: RiskCeiling) -> Self {
        match ceiling {
            RiskCeiling::Safe => RiskLevel::Safe,
            RiskCeiling::Low => RiskLevel::Low,
            RiskCeiling::Medium => RiskLevel::Medium,
            RiskCeiling::High => RiskLevel::High,
        }
    }
}

/// Print the gate log and final message, then turn the outcome into the
/// command result so `main` picks the right exit code.
fn finish(outcome: PipelineOutcome) -> Result<()> {
    println!("Gates:");
    for entry in &outcome.log {
        println!("  {:<20} {:<8} {}", entry.gate, entry.outcome, entry.message);
    }
    println!();
    println!("{}", outcome.message);

    match outcome.error {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Human-readable byte count.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
