//! Implementation of the `sweepguard execute` command.

use super::finish;
use crate::cli::ExecuteArgs;
use crate::config::Config;
use crate::confirm::{Confirmer, PreApproved, StdinConfirmer};
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use crate::events::operation_state;
use crate::pipeline::GatePipeline;
use crate::scanner::load_proposal;

/// Run an approved proposal through the pipeline.
///
/// The proposal must have a standing approval in the event log. Approval
/// lets the operation start; it does not replace the confirmation gate,
/// which still challenges whoever is named by `--confirmed-by` (or the
/// terminal).
pub fn cmd_execute(ctx: &ProjectContext, config: &Config, args: ExecuteArgs) -> Result<()> {
    let operation = load_proposal(ctx, &args.operation_id)?;

    let state = operation_state(ctx, &operation.operation_id)?;
    match &state {
        Some(s) if s.status.is_terminal() => {
            return Err(GuardError::UserError(format!(
                "operation '{}' is already {}",
                operation.operation_id, s.status
            )));
        }
        Some(s) if s.is_approved() => {}
        _ => {
            return Err(GuardError::UserError(format!(
                "operation '{}' has not been approved.\n\n\
                 Approve it first:\n  sweepguard propose --operation {} --approve",
                operation.operation_id, operation.operation_id
            )));
        }
    }

    let confirmer: Box<dyn Confirmer> = match &args.confirmed_by {
        Some(name) => Box::new(PreApproved::new(name)),
        None => Box::new(StdinConfirmer::new()),
    };

    let operation = operation.with_manual_override(args.manual_override);
    let outcome = GatePipeline::new(ctx, config)?
        .with_confirmer(confirmer)
        .run(operation);

    finish(outcome)
}
