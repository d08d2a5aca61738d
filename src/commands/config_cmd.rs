//! Implementation of the `sweepguard config` command.

use crate::cli::ConfigArgs;
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use tracing::info;

/// Apply policy toggles and print the effective configuration.
///
/// The config file is re-read here rather than taken from the dispatcher so
/// that a run with no toggles never rewrites it.
pub fn cmd_config(ctx: &ProjectContext, args: ConfigArgs) -> Result<()> {
    let mut config = Config::load_or_default(ctx.config_path())?;

    let toggles = [
        ("strict_mode", args.strict_mode, &mut config.strict_mode),
        (
            "auto_rollback_on_failure",
            args.auto_rollback,
            &mut config.auto_rollback_on_failure,
        ),
        (
            "require_confirmation_for_medium_risk",
            args.medium_confirm,
            &mut config.require_confirmation_for_medium_risk,
        ),
    ];

    let mut changed = Vec::new();
    for (name, toggle, field) in toggles {
        if let Some(toggle) = toggle {
            *field = toggle.enabled();
            changed.push((name, toggle.enabled()));
        }
    }

    if !changed.is_empty() {
        ctx.ensure_state_dirs()?;
        config.save(ctx.config_path())?;
        for (name, value) in &changed {
            info!(setting = name, value, "config updated");
            println!("Set {} = {}", name, value);
        }
    }

    if args.show || changed.is_empty() {
        if !changed.is_empty() {
            println!();
        }
        println!("# {}", ctx.config_path().display());
        print!("{}", config.to_yaml()?);
    }

    Ok(())
}
