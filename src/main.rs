//! Entry point for the `sweepguard` CLI. It installs logging, parses
//! arguments, dispatches to the command handler and maps errors to exit
//! codes.

use anyhow::Context;
use std::io::Write;
use std::process::ExitCode;
use sweepguard::cli::Cli;
use sweepguard::error::GuardError;
use sweepguard::{commands, exit_codes};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `info`, `sweepguard=debug`).
const LOG_ENV: &str = "SWEEPGUARD_LOG";

fn init_tracing() -> anyhow::Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(spec) => EnvFilter::try_new(&spec).with_context(|| format!("invalid {}", LOG_ENV))?,
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Print why a command failed. Reasons go to stdout next to the command's
/// own output; stderr carries only log lines.
fn report_error(out: &mut dyn Write, err: &GuardError) -> u8 {
    let _ = writeln!(out, "Error: {}", err);
    let _ = out.flush();
    err.exit_code() as u8
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("Warning: {:#}", err);
    }

    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => ExitCode::from(report_error(&mut std::io::stdout().lock(), &err)),
    }
}
