//! Implementation of the `sweepguard lock` commands.

use crate::cli::LockClearArgs;
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::locks;
use tracing::info;

/// List all active operation and path locks.
pub fn cmd_lock_list(ctx: &ProjectContext, config: &Config) -> Result<()> {
    let locks = locks::list_locks(ctx, config)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {} ({}):", lock.name, lock.lock_type.as_str());
        println!("    Owner:      {}", lock.metadata.owner);
        if let Some(pid) = lock.metadata.pid {
            println!("    PID:        {}", pid);
        }
        println!(
            "    Created:    {}",
            lock.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("    Age:        {}", lock.metadata.age_string());
        println!("    Action:     {}", lock.metadata.action);
        println!("    Operation:  {}", lock.metadata.operation_id);
        if let Some(target) = &lock.metadata.target {
            println!("    Target:     {}", target.display());
        }
        if lock.is_stale {
            println!(
                "    Status:     STALE (exceeds {} min threshold)",
                config.lock_stale_minutes
            );
        }
        println!();
    }

    let stale_count = locks.iter().filter(|l| l.is_stale).count();
    if stale_count > 0 {
        println!(
            "Note: {} lock(s) are stale. Use `sweepguard lock clear <lock-id> --force` to clear.",
            stale_count
        );
    }

    Ok(())
}

/// Remove a lock left behind by a crashed run.
pub fn cmd_lock_clear(ctx: &ProjectContext, config: &Config, args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(GuardError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock while its holder is still running lets two runs touch\n\
             the same files. Only clear locks whose holder has crashed.\n\n\
             To clear the lock, run:\n  sweepguard lock clear {} --force",
            args.lock_id
        )));
    }

    let cleared = locks::clear_lock(ctx, &args.lock_id, config)?;

    info!(
        lock_id = %cleared.name,
        lock_type = cleared.lock_type.as_str(),
        age_minutes = cleared.metadata.age().num_minutes(),
        was_stale = cleared.is_stale,
        owner = %cleared.metadata.owner,
        original_action = %cleared.metadata.action,
        "lock cleared"
    );

    println!("Cleared lock: {}", cleared.name);
    println!();
    println!("Lock details:");
    println!("  Owner:      {}", cleared.metadata.owner);
    if let Some(pid) = cleared.metadata.pid {
        println!("  PID:        {}", pid);
    }
    println!("  Age:        {}", cleared.metadata.age_string());
    println!("  Action:     {}", cleared.metadata.action);
    println!("  Operation:  {}", cleared.metadata.operation_id);
    if !cleared.is_stale {
        println!();
        println!("Warning: the lock was not stale; its holder may still be running.");
    }

    Ok(())
}
