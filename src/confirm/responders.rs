//! Built-in confirmers.

use super::challenge::Challenge;
use super::{Confirmer, Response};
use crate::events::get_actor_string;
use crate::operation::ConfirmationLevel;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Interactive confirmer: prints the challenge and reads one line of stdin.
///
/// The read happens on a helper thread so the pipeline can stop waiting at
/// the deadline. A thread still blocked on stdin after a timeout is left
/// behind and ends with the process.
#[derive(Debug, Clone)]
pub struct StdinConfirmer {
    by: String,
}

impl StdinConfirmer {
    pub fn new() -> Self {
        Self {
            by: get_actor_string(),
        }
    }
}

impl Default for StdinConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirmer for StdinConfirmer {
    fn name(&self) -> &str {
        "stdin"
    }

    fn present(&mut self, challenge: &Challenge) -> Receiver<Response> {
        println!();
        println!("{}", challenge.prompt);
        match challenge.level {
            ConfirmationLevel::Complex => println!(
                "Type the code exactly as shown to confirm: {}",
                challenge.code
            ),
            _ => println!("Type {} to confirm:", challenge.code),
        }
        println!("(waiting {}s; empty input cancels)", challenge.timeout.as_secs());

        let (tx, rx) = mpsc::channel();
        let by = self.by.clone();
        std::thread::spawn(move || {
            let mut line = String::new();
            let response = match std::io::stdin().lock().read_line(&mut line) {
                Ok(n) if n > 0 && !line.trim().is_empty() => Response::Answer { text: line, by },
                _ => Response::Cancel,
            };
            let _ = tx.send(response);
        });
        rx
    }
}

/// Non-interactive default: every challenge is cancelled immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Confirmer for DenyAll {
    fn name(&self) -> &str {
        "deny-all"
    }

    fn present(&mut self, _challenge: &Challenge) -> Receiver<Response> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(Response::Cancel);
        rx
    }
}

/// Answers every challenge on behalf of someone who already approved the
/// operation (e.g. a standing `user_approved` event).
#[derive(Debug, Clone)]
pub struct PreApproved {
    by: String,
}

impl PreApproved {
    pub fn new(by: impl Into<String>) -> Self {
        Self { by: by.into() }
    }
}

impl Confirmer for PreApproved {
    fn name(&self) -> &str {
        "pre-approved"
    }

    fn present(&mut self, challenge: &Challenge) -> Receiver<Response> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(Response::Answer {
            text: challenge.code.clone(),
            by: self.by.clone(),
        });
        rx
    }
}

/// Answers challenges with a closure. `None` means never answer, which the
/// pipeline sees as a timeout.
pub struct ScriptedConfirmer<F> {
    script: F,
    silent: Vec<Sender<Response>>,
}

impl<F> ScriptedConfirmer<F>
where
    F: FnMut(&Challenge) -> Option<Response> + Send,
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            silent: Vec::new(),
        }
    }
}

impl<F> Confirmer for ScriptedConfirmer<F>
where
    F: FnMut(&Challenge) -> Option<Response> + Send,
{
    fn name(&self) -> &str {
        "scripted"
    }

    fn present(&mut self, challenge: &Challenge) -> Receiver<Response> {
        let (tx, rx) = mpsc::channel();
        match (self.script)(challenge) {
            Some(response) => {
                let _ = tx.send(response);
            }
            None => self.silent.push(tx),
        }
        rx
    }
}

type PendingSender = Arc<Mutex<Option<Sender<Response>>>>;

/// Confirmer driven from another thread through a [`ConfirmationHandle`].
pub struct ChannelConfirmer {
    challenges: Sender<Challenge>,
    pending: PendingSender,
}

/// The answering side of a [`ChannelConfirmer`].
pub struct ConfirmationHandle {
    challenges: Receiver<Challenge>,
    pending: PendingSender,
}

impl ChannelConfirmer {
    pub fn new() -> (Self, ConfirmationHandle) {
        let (tx, rx) = mpsc::channel();
        let pending: PendingSender = Arc::new(Mutex::new(None));
        (
            Self {
                challenges: tx,
                pending: Arc::clone(&pending),
            },
            ConfirmationHandle {
                challenges: rx,
                pending,
            },
        )
    }
}

impl Confirmer for ChannelConfirmer {
    fn name(&self) -> &str {
        "channel"
    }

    fn present(&mut self, challenge: &Challenge) -> Receiver<Response> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut slot) = self.pending.lock() {
            *slot = Some(tx);
        }
        let _ = self.challenges.send(challenge.clone());
        rx
    }
}

impl ConfirmationHandle {
    /// Wait for the next challenge.
    pub fn next_challenge(&self, timeout: Duration) -> Option<Challenge> {
        self.challenges.recv_timeout(timeout).ok()
    }

    /// Answer the outstanding challenge. Returns false if none is pending.
    pub fn answer(&self, text: impl Into<String>, by: impl Into<String>) -> bool {
        self.send(Response::Answer {
            text: text.into(),
            by: by.into(),
        })
    }

    /// Cancel the outstanding challenge (a denial).
    pub fn cancel(&self) -> bool {
        self.send(Response::Cancel)
    }

    fn send(&self, response: Response) -> bool {
        let Ok(mut slot) = self.pending.lock() else {
            return false;
        };
        match slot.take() {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }
}
