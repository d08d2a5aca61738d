//! Implementation of the backup commands: `list-backups`, `rollback` and
//! `clean-backups`.

use super::format_bytes;
use crate::backup::BackupStore;
use crate::cli::{CleanBackupsArgs, ListBackupsArgs, RollbackArgs};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::pipeline::GatePipeline;
use chrono::{Duration, Utc};

/// Print the newest backups with their operation and size.
pub fn cmd_list_backups(ctx: &ProjectContext, args: ListBackupsArgs) -> Result<()> {
    let store = BackupStore::new(ctx);
    let backups = store.list_backups()?;

    if backups.is_empty() {
        println!("No backups.");
        return Ok(());
    }

    let shown = backups.len().min(args.limit);
    println!("Backups ({} of {}):", shown, backups.len());
    println!();

    for backup in backups.iter().take(args.limit) {
        let manifest = &backup.manifest;
        println!("  {}", manifest.backup_id);
        println!(
            "    Created:    {}",
            manifest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!(
            "    Operation:  {} ({})",
            manifest.operation.operation_id, manifest.operation.operation_type
        );
        if !manifest.operation.description.is_empty() {
            println!("    About:      {}", manifest.operation.description);
        }
        println!("    Files:      {}", manifest.files.len());
        println!("    Size:       {}", format_bytes(backup.size_bytes));
        println!();
    }

    println!("Total backup size: {}", format_bytes(store.total_size()));
    Ok(())
}

/// Show what a backup would restore; restore it with `--confirm`.
pub fn cmd_rollback(ctx: &ProjectContext, config: &Config, args: RollbackArgs) -> Result<()> {
    let pipeline = GatePipeline::new(ctx, config)?;
    let manifest = pipeline.backups().load(&args.backup_id)?;

    println!(
        "Backup {} (operation {}, {}):",
        manifest.backup_id,
        manifest.operation.operation_id,
        manifest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for entry in &manifest.files {
        let original = ctx.relative(&entry.original).unwrap_or(&entry.original);
        match &entry.moved_to {
            Some(moved) => {
                let moved = ctx.relative(moved).unwrap_or(moved);
                println!("  restore {} (moved to {})", original.display(), moved.display());
            }
            None => println!("  restore {}", original.display()),
        }
    }
    println!();

    if !args.confirm {
        println!(
            "Dry run: nothing restored. Re-run with --confirm to restore:\n  sweepguard rollback {} --confirm",
            manifest.backup_id
        );
        return Ok(());
    }

    let report = pipeline.rollback(&args.backup_id)?;
    println!(
        "Restored {} path(s) from backup {} (operation {})",
        report.restored_count(),
        report.backup_id,
        report.operation_id
    );
    Ok(())
}

/// Remove backups older than the retention window.
pub fn cmd_clean_backups(
    ctx: &ProjectContext,
    config: &Config,
    args: CleanBackupsArgs,
) -> Result<()> {
    let days = args.days.unwrap_or(config.backup_retention_days);
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let report = BackupStore::new(ctx).prune(cutoff, args.dry_run)?;

    let verb = if report.dry_run { "Would remove" } else { "Removed" };

    if report.removed.is_empty() {
        println!("No backups older than {} day(s) to remove.", days);
    } else {
        println!("{} {} backup(s) older than {} day(s):", verb, report.removed.len(), days);
        for pruned in &report.removed {
            println!(
                "  {} (operation {}, {})",
                pruned.backup_id,
                pruned.operation_id,
                format_bytes(pruned.size_bytes)
            );
        }
        println!();
        let freed = if report.dry_run { "Would free" } else { "Freed" };
        println!("{}: {}", freed, format_bytes(report.bytes_freed()));
    }

    if !report.kept_active.is_empty() {
        println!();
        println!(
            "Kept {} backup(s) whose operation is unfinished or running:",
            report.kept_active.len()
        );
        for backup_id in &report.kept_active {
            println!("  {}", backup_id);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("Failed to remove {} backup(s):", report.errors.len());
        for (backup_id, message) in &report.errors {
            println!("  {}: {}", backup_id, message);
        }
    }

    Ok(())
}
