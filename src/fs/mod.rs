//! Filesystem utilities for sweepguard.
//!
//! Atomic writes keep manifests, proposals and config readable at every
//! instant; copy and remove helpers treat files and directory trees
//! uniformly so a target can be either.

pub mod atomic;
mod copy;
mod move_file;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
pub use copy::{copy_path, path_size, remove_path};
pub use move_file::move_path;
