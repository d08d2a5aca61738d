//! Sweepguard: backup-first, risk-gated destructive filesystem operations.
//!
//! A cleanup operation (delete, move or modify a set of paths) either is
//! refused before anything changes, runs after risk assessment and the
//! confirmation it calls for with a restorable backup, or is restored from
//! that backup when it fails. See [`pipeline`] for the gate sequence and
//! [`scanner`] for candidate discovery.

pub mod backup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod context;
pub mod dependency;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod operation;
pub mod pipeline;
pub mod protected;
pub mod risk;
pub mod scanner;

#[cfg(test)]
mod test_support;

pub use pipeline::{GatePipeline, PipelineOutcome, execute_cleanup_operation, rollback_operation};
