//! Configuration defaults for sweepguard.
//!
//! Default value functions used by serde and by `Config::default()`.

/// Built-in protected patterns: build manifests, VCS metadata, lock files.
///
/// Patterns are globs matched against the project-relative path and against
/// the bare file name. User-configured patterns extend this list; they never
/// replace it.
pub fn default_protected_patterns() -> Vec<String> {
    [
        ".git",
        ".git/**",
        ".hg/**",
        ".svn/**",
        ".sweepguard",
        ".sweepguard/**",
        "Cargo.toml",
        "pyproject.toml",
        "setup.py",
        "setup.cfg",
        "requirements.txt",
        "package.json",
        "go.mod",
        "go.sum",
        "Makefile",
        "*.lock",
        "package-lock.json",
        "pnpm-lock.yaml",
        ".gitignore",
        ".env",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// File extensions searched for references by the dependency analyzer
/// (no leading dots).
pub fn default_dependency_extensions() -> Vec<String> {
    [
        "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "c", "h", "cpp", "hpp", "rb",
        "toml", "yaml", "yml", "json", "cfg", "ini", "md", "sh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_confirmation_timeout_seconds() -> u64 {
    30
}
pub(crate) fn default_max_confirmation_timeout_seconds() -> u64 {
    300
}
pub(crate) fn default_backup_retention_days() -> u32 {
    30
}
pub(crate) fn default_max_dependency_file_bytes() -> u64 {
    1024 * 1024
}
pub(crate) fn default_scan_max_files() -> usize {
    10_000
}
pub(crate) fn default_lock_stale_minutes() -> u32 {
    60
}
pub(crate) fn default_true() -> bool {
    true
}
