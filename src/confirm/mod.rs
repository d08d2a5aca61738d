//! Confirmation protocol.
//!
//! The pipeline never reads a terminal directly. It issues a [`Challenge`]
//! to a [`Confirmer`], which answers asynchronously on a channel; the
//! pipeline waits on that channel with a deadline. No answer before the
//! deadline, a cancelled request and a wrong code are all denials.
//!
//! Codes are checked programmatically: simple codes case-insensitively,
//! complex codes exactly. A near miss on a complex code is a denial.

mod challenge;
mod responders;

#[cfg(test)]
mod tests;

pub use challenge::{Challenge, confirmation_timeout};
pub use responders::{
    ChannelConfirmer, ConfirmationHandle, DenyAll, PreApproved, ScriptedConfirmer,
    StdinConfirmer,
};

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::debug;

/// What a responder sends back for a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Typed answer and who typed it.
    Answer { text: String, by: String },
    /// The responder withdrew the request.
    Cancel,
}

/// Presents challenges to whoever can answer them.
pub trait Confirmer: Send {
    /// Short name used in logs and event details.
    fn name(&self) -> &str;

    /// Present `challenge`; the answer arrives on the returned channel.
    fn present(&mut self, challenge: &Challenge) -> Receiver<Response>;
}

/// Final result of one confirmation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed { by: String },
    Denied { reason: String },
}

impl ConfirmationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationOutcome::Confirmed { .. })
    }
}

/// Block until a response arrives or `timeout` elapses.
///
/// Returns `None` on timeout or when the responder hung up.
pub fn await_response(rx: &Receiver<Response>, timeout: Duration) -> Option<Response> {
    match rx.recv_timeout(timeout) {
        Ok(response) => Some(response),
        Err(RecvTimeoutError::Timeout) => {
            debug!(timeout_secs = timeout.as_secs(), "confirmation timed out");
            None
        }
        Err(RecvTimeoutError::Disconnected) => None,
    }
}

/// Run one full confirmation round for `challenge`.
pub fn confirm(confirmer: &mut dyn Confirmer, challenge: &Challenge) -> ConfirmationOutcome {
    let rx = confirmer.present(challenge);

    match await_response(&rx, challenge.timeout) {
        Some(Response::Answer { text, by }) => {
            if challenge.matches(&text) {
                ConfirmationOutcome::Confirmed { by }
            } else {
                ConfirmationOutcome::Denied {
                    reason: format!("confirmation code mismatch (answered by {})", by),
                }
            }
        }
        Some(Response::Cancel) => ConfirmationOutcome::Denied {
            reason: format!("confirmation cancelled by {}", confirmer.name()),
        },
        None => ConfirmationOutcome::Denied {
            reason: format!(
                "no confirmation within {}s",
                challenge.timeout.as_secs()
            ),
        },
    }
}
