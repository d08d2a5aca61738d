//! CLI argument parsing for sweepguard.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sweepguard: backup-first, risk-gated cleanup of project files.
///
/// Every destructive operation passes six gates:
/// - protected paths are refused outright
/// - references from other files and a risk score decide how much
///   confirmation is needed
/// - every target is backed up before it is touched, and any failure
///   afterwards restores the backup
#[derive(Parser, Debug)]
#[command(name = "sweepguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root. Defaults to the nearest ancestor holding `.sweepguard/`,
    /// else the current directory.
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for sweepguard.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an operation through the pipeline.
    ///
    /// Without paths, a synthetic operation over sandbox files is used.
    /// Without `--execute`, only a dry run is printed.
    Test(TestArgs),

    /// List backups, newest first.
    ListBackups(ListBackupsArgs),

    /// Restore the files recorded in a backup.
    Rollback(RollbackArgs),

    /// Remove backups older than the retention window.
    ///
    /// Backups of operations that are still running or never finished
    /// are kept.
    CleanBackups(CleanBackupsArgs),

    /// Show or change gate policy settings.
    Config(ConfigArgs),

    /// Summarize configuration, backups, recent events and locks.
    Status,

    /// Find cleanup candidates and cache them in `.sweepguard/scan.json`.
    Scan(ScanArgs),

    /// Build a cleanup proposal from the last scan, or decide on one.
    Propose(ProposeArgs),

    /// Execute an approved proposal.
    Execute(ExecuteArgs),

    /// Lock management commands.
    ///
    /// List or clear operation and path locks.
    Lock(LockCommand),
}

/// Operation kinds accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Delete,
    Move,
    Modify,
}

/// Risk ceilings accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskCeiling {
    Safe,
    Low,
    Medium,
    High,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

/// Arguments for the `test` command.
#[derive(Parser, Debug)]
pub struct TestArgs {
    /// Target paths, relative to the project root. Omit for a sandbox run.
    pub paths: Vec<PathBuf>,

    /// Operation type.
    #[arg(long = "type", value_enum, default_value = "delete")]
    pub op_type: OperationKind,

    /// Actually run the pipeline instead of printing a dry run.
    #[arg(long)]
    pub execute: bool,

    /// Number of sandbox files for a synthetic run.
    #[arg(long, default_value_t = 3)]
    pub count: usize,

    /// Destination directory for `move` (defaults to the quarantine).
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// Replacement content for `modify` (required with `--type modify`).
    #[arg(long, required_if_eq("op_type", "modify"))]
    pub content: Option<String>,

    /// Allow a critical-risk operation to proceed to confirmation.
    #[arg(long = "override")]
    pub manual_override: bool,
}

/// Arguments for the `list-backups` command.
#[derive(Parser, Debug)]
pub struct ListBackupsArgs {
    /// Maximum number of backups to show.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

/// Arguments for the `rollback` command.
#[derive(Parser, Debug)]
pub struct RollbackArgs {
    /// Backup ID to restore (e.g., backup_20260101_120000_ab12cd34).
    pub backup_id: String,

    /// Restore without asking. Without it, only the plan is printed.
    #[arg(long)]
    pub confirm: bool,
}

/// Arguments for the `clean-backups` command.
#[derive(Parser, Debug)]
pub struct CleanBackupsArgs {
    /// Age in days after which a backup may be removed (defaults to config).
    #[arg(long)]
    pub days: Option<u32>,

    /// Print what would be removed without removing it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `config` command.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Raise every confirmation requirement by one step.
    #[arg(long, value_enum)]
    pub strict_mode: Option<Toggle>,

    /// Escalate incomplete restores to a rollback failure.
    #[arg(long, value_enum)]
    pub auto_rollback: Option<Toggle>,

    /// Require confirmation for medium-risk operations.
    #[arg(long, value_enum)]
    pub medium_confirm: Option<Toggle>,

    /// Print the effective configuration.
    #[arg(long)]
    pub show: bool,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Stop after this many candidates (defaults to config).
    #[arg(long)]
    pub max_files: Option<usize>,
}

/// Arguments for the `propose` command.
#[derive(Parser, Debug)]
pub struct ProposeArgs {
    /// Highest discovery risk to include.
    #[arg(long, value_enum, default_value = "low")]
    pub risk_level: RiskCeiling,

    /// Size budget for the proposal in megabytes.
    #[arg(long, default_value_t = 100.0)]
    pub max_size_mb: f64,

    /// Decide on an existing proposal instead of building a new one.
    #[arg(long)]
    pub operation: Option<String>,

    /// Record approval of the proposal.
    #[arg(long, conflicts_with = "reject")]
    pub approve: bool,

    /// Record rejection of the proposal.
    #[arg(long)]
    pub reject: bool,

    /// Name recorded as the approver or rejecter.
    #[arg(long)]
    pub by: Option<String>,
}

/// Arguments for the `execute` command.
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Operation ID of an approved proposal.
    pub operation_id: String,

    /// Answer the confirmation challenge on behalf of NAME instead of
    /// prompting on the terminal.
    #[arg(long)]
    pub confirmed_by: Option<String>,

    /// Allow a critical-risk operation to proceed to confirmation.
    #[arg(long = "override")]
    pub manual_override: bool,
}

/// Lock management subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all active locks.
    List,

    /// Clear a specific lock (requires --force).
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock name as shown by `lock list` (e.g., op-<operation_id>).
    pub lock_id: String,

    /// Clear the lock even though its holder may still be running.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_test_defaults() {
        let cli = Cli::try_parse_from(["sweepguard", "test"]).unwrap();
        if let Command::Test(args) = cli.command {
            assert!(args.paths.is_empty());
            assert_eq!(args.op_type, OperationKind::Delete);
            assert!(!args.execute);
            assert_eq!(args.count, 3);
        } else {
            panic!("Expected Test command");
        }
    }

    #[test]
    fn parse_test_full() {
        let cli = Cli::try_parse_from([
            "sweepguard",
            "test",
            "logs/a.log",
            "logs/b.log",
            "--type",
            "move",
            "--execute",
            "--destination",
            "archive",
        ])
        .unwrap();
        if let Command::Test(args) = cli.command {
            assert_eq!(
                args.paths,
                vec![PathBuf::from("logs/a.log"), PathBuf::from("logs/b.log")]
            );
            assert_eq!(args.op_type, OperationKind::Move);
            assert!(args.execute);
            assert_eq!(args.destination, Some(PathBuf::from("archive")));
        } else {
            panic!("Expected Test command");
        }
    }

    #[test]
    fn parse_test_modify_requires_content() {
        let missing = Cli::try_parse_from(["sweepguard", "test", "notes.txt", "--type", "modify"]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "sweepguard",
            "test",
            "notes.txt",
            "--type",
            "modify",
            "--content",
            "",
        ])
        .unwrap();
        if let Command::Test(args) = cli.command {
            assert_eq!(args.content.as_deref(), Some(""));
        } else {
            panic!("Expected Test command");
        }
    }

    #[test]
    fn parse_global_project_root() {
        let cli = Cli::try_parse_from(["sweepguard", "status", "--project-root", "/tmp/p"]).unwrap();
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp/p")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn parse_rollback() {
        let cli = Cli::try_parse_from(["sweepguard", "rollback", "backup_x", "--confirm"]).unwrap();
        if let Command::Rollback(args) = cli.command {
            assert_eq!(args.backup_id, "backup_x");
            assert!(args.confirm);
        } else {
            panic!("Expected Rollback command");
        }
    }

    #[test]
    fn parse_clean_backups() {
        let cli =
            Cli::try_parse_from(["sweepguard", "clean-backups", "--days", "7", "--dry-run"]).unwrap();
        if let Command::CleanBackups(args) = cli.command {
            assert_eq!(args.days, Some(7));
            assert!(args.dry_run);
        } else {
            panic!("Expected CleanBackups command");
        }
    }

    #[test]
    fn parse_config_toggles() {
        let cli = Cli::try_parse_from([
            "sweepguard",
            "config",
            "--strict-mode",
            "on",
            "--medium-confirm",
            "off",
        ])
        .unwrap();
        if let Command::Config(args) = cli.command {
            assert_eq!(args.strict_mode, Some(Toggle::On));
            assert_eq!(args.auto_rollback, None);
            assert_eq!(args.medium_confirm, Some(Toggle::Off));
            assert!(!args.show);
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn parse_propose() {
        let cli = Cli::try_parse_from([
            "sweepguard",
            "propose",
            "--risk-level",
            "safe",
            "--max-size-mb",
            "2.5",
            "--approve",
            "--by",
            "alice",
        ])
        .unwrap();
        if let Command::Propose(args) = cli.command {
            assert_eq!(args.risk_level, RiskCeiling::Safe);
            assert_eq!(args.max_size_mb, 2.5);
            assert!(args.approve);
            assert_eq!(args.by.as_deref(), Some("alice"));
        } else {
            panic!("Expected Propose command");
        }
    }

    #[test]
    fn propose_approve_and_reject_conflict() {
        let result = Cli::try_parse_from(["sweepguard", "propose", "--approve", "--reject"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_execute() {
        let cli = Cli::try_parse_from([
            "sweepguard",
            "execute",
            "op-1",
            "--confirmed-by",
            "bob",
            "--override",
        ])
        .unwrap();
        if let Command::Execute(args) = cli.command {
            assert_eq!(args.operation_id, "op-1");
            assert_eq!(args.confirmed_by.as_deref(), Some("bob"));
            assert!(args.manual_override);
        } else {
            panic!("Expected Execute command");
        }
    }

    #[test]
    fn parse_lock_clear() {
        let cli = Cli::try_parse_from(["sweepguard", "lock", "clear", "op-op-1", "--force"]).unwrap();
        if let Command::Lock(LockCommand {
            action: LockAction::Clear(args),
        }) = cli.command
        {
            assert_eq!(args.lock_id, "op-op-1");
            assert!(args.force);
        } else {
            panic!("Expected Lock Clear command");
        }
    }
}
