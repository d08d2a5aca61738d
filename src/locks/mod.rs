//! Locking subsystem for sweepguard.
//!
//! Two kinds of lock keep concurrent pipeline runs apart:
//! - Per-operation lock (`op-<operation_id>.lock`): one run of an operation at a time.
//! - Per-path locks (`path-<sha256 of canonical path>.lock`): two running
//!   operations can never touch the same target.
//!
//! # Lock Files
//!
//! Lock files are stored in `.sweepguard/locks/`. They are created using
//! **create_new** semantics (exclusive create) so only one process can
//! acquire a given lock at a time. Path locks are acquired in sorted digest
//! order, and the whole set is released if any one of them is held elsewhere.
//!
//! # Lock Metadata
//!
//! Each lock file contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `action`: What the holder is doing (execute/rollback/prune)
//! - `operation_id`: The operation holding the lock
//! - `target`: The locked path, for path locks
//!
//! # RAII Guards
//!
//! Locks are managed through RAII guard objects that release the lock when
//! dropped, on every exit path including panics. If deletion fails during
//! drop, a warning is logged but the program does not crash.

mod guard;
mod metadata;
mod operations;
mod types;


// Re-export public API
pub use guard::{LockGuard, PathLockSet};
pub use metadata::LockMetadata;
pub use operations::{
    acquire_operation_lock, acquire_path_locks, clear_lock, is_operation_locked, list_locks,
    path_digest,
};
pub use types::{LockInfo, LockType};
