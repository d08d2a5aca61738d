//! Implementation of the `sweepguard status` command.
//!
//! Summarizes the gate policy, the backup store, open proposals, the most
//! recent events and any held locks.

use super::format_bytes;
use crate::backup::BackupStore;
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use crate::events::{read_events, replay};
use crate::locks;
use crate::scanner::list_proposals;

/// Number of trailing events shown.
const RECENT_EVENTS: usize = 10;

/// Execute the `sweepguard status` command.
pub fn cmd_status(ctx: &ProjectContext, config: &Config) -> Result<()> {
    let store = BackupStore::new(ctx);
    let backups = store.list_backups()?;
    let proposals = list_proposals(ctx)?;
    let states = replay(ctx)?;
    let events = read_events(ctx)?;
    let active_locks = locks::list_locks(ctx, config)?;

    println!("Sweepguard Status");
    println!("=================");
    println!();
    println!("Project: {}", ctx.project_root.display());
    println!();

    println!("Policy:");
    println!("  strict_mode                           {}", config.strict_mode);
    println!(
        "  require_confirmation_for_medium_risk  {}",
        config.require_confirmation_for_medium_risk
    );
    println!(
        "  auto_rollback_on_failure              {}",
        config.auto_rollback_on_failure
    );
    println!(
        "  dependency_analysis                   {}",
        config.dependency_analysis
    );
    println!("  post_validation                       {}", config.post_validation);
    println!(
        "  backup_retention_days                 {}",
        config.backup_retention_days
    );
    println!();

    println!(
        "Backups: {} ({})",
        backups.len(),
        format_bytes(store.total_size())
    );
    if let Some(latest) = backups.first() {
        println!(
            "  latest: {} ({})",
            latest.manifest.backup_id,
            latest.manifest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();

    println!("Proposals: {}", proposals.len());
    for proposal in &proposals {
        let status = states
            .get(&proposal.operation_id)
            .map_or("no events", |s| s.status.as_str());
        println!(
            "  {:<40} {:<12} {} target(s)",
            proposal.operation_id,
            status,
            proposal.targets.len()
        );
    }
    println!();

    println!("Recent events:");
    if events.is_empty() {
        println!("  (none)");
    }
    let skip = events.len().saturating_sub(RECENT_EVENTS);
    for event in events.iter().skip(skip) {
        println!(
            "  {}  {:<14} {}  by {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event.to_string(),
            event.operation_id,
            event.actor
        );
    }
    println!();

    println!("Locks: {}", active_locks.len());
    for lock in &active_locks {
        let stale_marker = if lock.is_stale { " [STALE]" } else { "" };
        println!(
            "  - {} (by {}, {} ago, action: {}){}",
            lock.name,
            lock.metadata.owner,
            lock.metadata.age_string(),
            lock.metadata.action,
            stale_marker
        );
    }
    let stale_count = active_locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!();
        println!(
            "{} stale lock(s) detected (older than {} minutes). Use `sweepguard lock clear <lock-id> --force` to clear.",
            stale_count, config.lock_stale_minutes
        );
    }

    Ok(())
}
