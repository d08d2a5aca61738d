//! Configuration model for sweepguard.
//!
//! This module defines the Config struct that represents `.sweepguard/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::Config;
pub use types::{default_dependency_extensions, default_protected_patterns};
