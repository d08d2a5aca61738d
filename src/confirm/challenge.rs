//! Challenge codes and timeout scaling.

use crate::config::Config;
use crate::operation::ConfirmationLevel;
use rand::Rng;
use std::time::Duration;

const SIMPLE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// No 0/O, 1/I/L: complex codes are meant to be read and retyped.
const COMPLEX_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

const SIMPLE_LEN: usize = 6;
const COMPLEX_SEGMENTS: usize = 3;
const COMPLEX_SEGMENT_LEN: usize = 4;

/// A code the confirmer must type back, with the wait deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub level: ConfirmationLevel,
    pub code: String,
    /// Human-readable description of what is being confirmed.
    pub prompt: String,
    pub timeout: Duration,
}

impl Challenge {
    /// Generate a fresh code for `level`.
    ///
    /// `ConfirmationLevel::None` still gets a simple code; callers only
    /// issue challenges when confirmation is required.
    pub fn generate(level: ConfirmationLevel, prompt: impl Into<String>, timeout: Duration) -> Self {
        let code = match level {
            ConfirmationLevel::Complex => complex_code(),
            ConfirmationLevel::None | ConfirmationLevel::Simple => simple_code(),
        };

        Self {
            level,
            code,
            prompt: prompt.into(),
            timeout,
        }
    }

    /// Whether `response` satisfies the challenge.
    pub fn matches(&self, response: &str) -> bool {
        let response = response.trim();
        match self.level {
            ConfirmationLevel::Complex => response == self.code,
            ConfirmationLevel::None | ConfirmationLevel::Simple => {
                response.eq_ignore_ascii_case(&self.code)
            }
        }
    }
}

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

fn simple_code() -> String {
    random_string(SIMPLE_ALPHABET, SIMPLE_LEN)
}

fn complex_code() -> String {
    (0..COMPLEX_SEGMENTS)
        .map(|_| random_string(COMPLEX_ALPHABET, COMPLEX_SEGMENT_LEN))
        .collect::<Vec<_>>()
        .join("-")
}

/// How long to wait for an answer.
///
/// Base from config, doubled for complex codes, plus one second per ten
/// targets, capped at `max_confirmation_timeout_seconds`.
pub fn confirmation_timeout(
    config: &Config,
    level: ConfirmationLevel,
    target_count: usize,
) -> Duration {
    let mut secs = config.confirmation_timeout_seconds;
    if level == ConfirmationLevel::Complex {
        secs = secs.saturating_mul(2);
    }
    secs = secs.saturating_add((target_count / 10) as u64);
    Duration::from_secs(secs.min(config.max_confirmation_timeout_seconds))
}
