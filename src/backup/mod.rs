//! Backup store for sweepguard.
//!
//! A backup is a point-in-time copy of every target of one operation, taken
//! before anything destructive happens. It is the only means of rollback.
//!
//! # Layout
//!
//! ```text
//! .sweepguard/backups/<backup_id>/
//!   manifest.json
//!   files/<index>/<name>
//! ```
//!
//! The manifest is written atomically and last: a directory without a valid
//! manifest is an incomplete backup and is ignored by listing and restore.

mod manifest;
mod prune;
mod restore;
mod store;


pub use manifest::{BackupEntry, BackupInfo, BackupManifest, OperationSnapshot, generate_backup_id};
pub use prune::{PruneReport, PrunedBackup};
pub use restore::{RestoreEntry, RestoreReport, RestoreStatus};
pub use store::BackupStore;
