//! Tests for the confirmation protocol.

use super::*;
use crate::config::Config;
use crate::operation::ConfirmationLevel;
use std::time::{Duration, Instant};

fn challenge(level: ConfirmationLevel) -> Challenge {
    Challenge::generate(level, "delete 1 target", Duration::from_secs(2))
}

#[test]
fn test_simple_code_shape() {
    let c = challenge(ConfirmationLevel::Simple);
    assert_eq!(c.code.len(), 6);
    assert!(c.code.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()));
}

#[test]
fn test_complex_code_shape() {
    let c = challenge(ConfirmationLevel::Complex);
    let segments: Vec<&str> = c.code.split('-').collect();

    assert_eq!(segments.len(), 3);
    for segment in segments {
        assert_eq!(segment.len(), 4);
        assert!(!segment.contains(['0', 'O', '1', 'I', 'L']));
    }
}

#[test]
fn test_codes_are_random() {
    let a = challenge(ConfirmationLevel::Complex);
    let b = challenge(ConfirmationLevel::Complex);
    assert_ne!(a.code, b.code);
}

#[test]
fn test_simple_match_is_case_insensitive() {
    let c = challenge(ConfirmationLevel::Simple);
    assert!(c.matches(&c.code));
    assert!(c.matches(&format!("  {}\n", c.code.to_lowercase())));
    assert!(!c.matches("nope"));
}

#[test]
fn test_complex_match_is_exact() {
    let c = challenge(ConfirmationLevel::Complex);
    assert!(c.matches(&format!("{}\n", c.code)));
    assert!(!c.matches(&c.code.replace('-', "")));

    // A single transposed character is a denial.
    let mut chars: Vec<char> = c.code.chars().collect();
    chars.swap(0, 1);
    let near_miss: String = chars.into_iter().collect();
    if near_miss != c.code {
        assert!(!c.matches(&near_miss));
    }
}

#[test]
fn test_timeout_scaling() {
    let config = Config::default();

    assert_eq!(
        confirmation_timeout(&config, ConfirmationLevel::Simple, 1),
        Duration::from_secs(30)
    );
    assert_eq!(
        confirmation_timeout(&config, ConfirmationLevel::Complex, 1),
        Duration::from_secs(60)
    );
    assert_eq!(
        confirmation_timeout(&config, ConfirmationLevel::Simple, 25),
        Duration::from_secs(32)
    );
    assert_eq!(
        confirmation_timeout(&config, ConfirmationLevel::Complex, 100_000),
        Duration::from_secs(300)
    );
}

#[test]
fn test_pre_approved_confirms() {
    let c = challenge(ConfirmationLevel::Complex);
    let outcome = confirm(&mut PreApproved::new("alice"), &c);
    assert_eq!(
        outcome,
        ConfirmationOutcome::Confirmed {
            by: "alice".to_string()
        }
    );
}

#[test]
fn test_deny_all_denies_immediately() {
    let c = challenge(ConfirmationLevel::Simple);
    let start = Instant::now();

    let outcome = confirm(&mut DenyAll, &c);

    assert!(!outcome.is_confirmed());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_wrong_code_is_denied() {
    let c = challenge(ConfirmationLevel::Simple);
    let mut confirmer = ScriptedConfirmer::new(|_: &Challenge| {
        Some(Response::Answer {
            text: "WRONG1".to_string(),
            by: "bob".to_string(),
        })
    });

    match confirm(&mut confirmer, &c) {
        ConfirmationOutcome::Denied { reason } => assert!(reason.contains("mismatch")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_silence_times_out() {
    let c = Challenge::generate(
        ConfirmationLevel::Simple,
        "delete",
        Duration::from_millis(100),
    );
    let mut confirmer = ScriptedConfirmer::new(|_: &Challenge| None);

    let start = Instant::now();
    match confirm(&mut confirmer, &c) {
        ConfirmationOutcome::Denied { reason } => assert!(reason.contains("no confirmation")),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_channel_confirmer_across_threads() {
    let (mut confirmer, handle) = ChannelConfirmer::new();

    let responder = std::thread::spawn(move || {
        let c = handle.next_challenge(Duration::from_secs(5)).unwrap();
        assert!(handle.answer(c.code.to_lowercase(), "carol"));
    });

    let c = challenge(ConfirmationLevel::Simple);
    let outcome = confirm(&mut confirmer, &c);
    responder.join().unwrap();

    assert_eq!(
        outcome,
        ConfirmationOutcome::Confirmed {
            by: "carol".to_string()
        }
    );
}

#[test]
fn test_channel_confirmer_cancel() {
    let (mut confirmer, handle) = ChannelConfirmer::new();

    let responder = std::thread::spawn(move || {
        handle.next_challenge(Duration::from_secs(5)).unwrap();
        assert!(handle.cancel());
        assert!(!handle.cancel(), "nothing left to cancel");
    });

    let outcome = confirm(&mut confirmer, &challenge(ConfirmationLevel::Complex));
    responder.join().unwrap();

    match outcome {
        ConfirmationOutcome::Denied { reason } => assert!(reason.contains("cancelled")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_await_response_disconnected_is_none() {
    let (tx, rx) = std::sync::mpsc::channel::<Response>();
    drop(tx);
    assert!(await_response(&rx, Duration::from_secs(5)).is_none());
}
