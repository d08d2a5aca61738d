//! Protected-path registry.
//!
//! The first gate's unconditional veto. A path is protected when:
//! - it lies outside the project root (or *is* the project root),
//! - its project-relative path or any of its component names matches a
//!   protected glob (build manifests, VCS metadata, lock files, state dir),
//! - or it is a directory that contains a protected entry.
//!
//! Patterns are matched with forward slashes regardless of platform.

use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};

/// Compiled protected patterns for one project.
#[derive(Debug, Clone)]
pub struct ProtectedPaths {
    project_root: PathBuf,
    patterns: Vec<String>,
    globs: GlobSet,
}

/// Why a path was judged protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionReason {
    /// The path is outside the project root, or is the root itself.
    OutsideProject,
    /// The path (or one of its components) matches a protected pattern.
    Pattern(String),
    /// The path is a directory containing a protected entry.
    ContainsProtected(PathBuf),
}

impl std::fmt::Display for ProtectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtectionReason::OutsideProject => write!(f, "outside the project root"),
            ProtectionReason::Pattern(p) => write!(f, "matches protected pattern '{}'", p),
            ProtectionReason::ContainsProtected(p) => {
                write!(f, "contains protected path '{}'", p.display())
            }
        }
    }
}

impl ProtectedPaths {
    /// Build the registry from the project context and config.
    pub fn new(ctx: &ProjectContext, config: &Config) -> Result<Self> {
        Self::from_patterns(&ctx.project_root, &config.all_protected_patterns())
    }

    /// Build the registry from explicit patterns.
    pub fn from_patterns<P: AsRef<Path>>(project_root: P, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let normalized = pattern.trim().replace('\\', "/");
            if normalized.is_empty() {
                continue;
            }
            let glob = Glob::new(&normalized).map_err(|e| {
                GuardError::UserError(format!(
                    "invalid protected pattern '{}': {}",
                    pattern, e
                ))
            })?;
            builder.add(glob);
            kept.push(normalized);
        }

        let globs = builder.build().map_err(|e| {
            GuardError::UserError(format!("failed to compile protected patterns: {}", e))
        })?;

        Ok(Self {
            project_root: project_root.as_ref().to_path_buf(),
            patterns: kept,
            globs,
        })
    }

    /// The normalized pattern list, in registration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `path` must never be targeted.
    pub fn is_protected(&self, path: &Path) -> bool {
        self.protection_reason(path).is_some()
    }

    /// Explain why `path` is protected, or `None` if it may be targeted.
    pub fn protection_reason(&self, path: &Path) -> Option<ProtectionReason> {
        let absolute = self.absolute(path);
        let Some(rel) = self.relative(&absolute) else {
            return Some(ProtectionReason::OutsideProject);
        };
        if rel.as_os_str().is_empty() {
            return Some(ProtectionReason::OutsideProject);
        }

        if let Some(pattern) = self.match_relative(&rel) {
            return Some(ProtectionReason::Pattern(pattern));
        }

        if absolute.is_dir()
            && let Some(inner) = self.first_protected_descendant(&absolute)
        {
            return Some(ProtectionReason::ContainsProtected(inner));
        }

        None
    }

    /// Whether `path` sits in the same directory as a protected entry.
    ///
    /// The project root is excluded: every project keeps its manifests there,
    /// so proximity only counts inside nested package directories.
    pub fn is_near_protected(&self, path: &Path) -> bool {
        let absolute = self.absolute(path);
        let Some(parent) = absolute.parent() else {
            return false;
        };
        if parent == self.project_root || self.relative(parent).is_none() {
            return false;
        }

        let Ok(entries) = std::fs::read_dir(parent) else {
            return false;
        };

        entries.flatten().any(|entry| {
            let sibling = entry.path();
            sibling != absolute
                && self
                    .relative(&sibling)
                    .is_some_and(|rel| self.match_relative(&rel).is_some())
        })
    }

    /// Protected entries directly inside `dir`, sorted.
    pub fn protected_entries(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut found: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| {
                self.relative(p)
                    .is_some_and(|rel| self.match_relative(&rel).is_some())
            })
            .collect();
        found.sort();
        found
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };
        joined
            .canonicalize()
            .unwrap_or_else(|_| normalize_lexically(&joined))
    }

    fn relative(&self, absolute: &Path) -> Option<PathBuf> {
        absolute
            .strip_prefix(&self.project_root)
            .ok()
            .map(Path::to_path_buf)
    }

    /// Match the relative path itself, then every component name.
    fn match_relative(&self, rel: &Path) -> Option<String> {
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if let Some(idx) = self.globs.matches(&rel_str).first() {
            return Some(self.patterns[*idx].clone());
        }

        for component in rel.components() {
            if let Component::Normal(name) = component
                && let Some(idx) = self.globs.matches(Path::new(name)).first()
            {
                return Some(self.patterns[*idx].clone());
            }
        }

        None
    }

    fn first_protected_descendant(&self, dir: &Path) -> Option<PathBuf> {
        walkdir::WalkDir::new(dir)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .flatten()
            .map(|entry| entry.into_path())
            .find(|p| {
                self.relative(p)
                    .is_some_and(|rel| self.match_relative(&rel).is_some())
            })
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_protected_patterns;
    use tempfile::TempDir;

    fn registry(root: &Path) -> ProtectedPaths {
        ProtectedPaths::from_patterns(root, &default_protected_patterns()).unwrap()
    }

    fn project() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::write(root.join("pyproject.toml"), "[project]\n").unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/app.py"), "print()\n").unwrap();
        (temp, root)
    }

    #[test]
    fn manifests_and_vcs_are_protected() {
        let (_temp, root) = project();
        let reg = registry(&root);

        assert!(reg.is_protected(&root.join("pyproject.toml")));
        assert!(reg.is_protected(&root.join(".git")));
        assert!(reg.is_protected(&root.join(".git/HEAD")));
        assert!(reg.is_protected(&root.join("Cargo.lock")));
        assert!(!reg.is_protected(&root.join("src/app.py")));
    }

    #[test]
    fn nested_manifest_matched_by_name() {
        let (_temp, root) = project();
        let reg = registry(&root);

        let reason = reg
            .protection_reason(&root.join("packages/web/package.json"))
            .unwrap();
        assert_eq!(reason, ProtectionReason::Pattern("package.json".to_string()));
    }

    #[test]
    fn outside_root_and_root_itself_are_protected() {
        let (_temp, root) = project();
        let reg = registry(&root);

        assert_eq!(
            reg.protection_reason(Path::new("/etc/passwd")),
            Some(ProtectionReason::OutsideProject)
        );
        assert!(reg.is_protected(&root));
        assert!(reg.is_protected(&root.join("src/../../escape.txt")));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let (_temp, root) = project();
        let reg = registry(&root);

        assert!(reg.is_protected(Path::new("pyproject.toml")));
        assert!(!reg.is_protected(Path::new("src/app.py")));
    }

    #[test]
    fn directory_containing_protected_entry_is_protected() {
        let (_temp, root) = project();
        std::fs::create_dir_all(root.join("vendor/lib")).unwrap();
        std::fs::write(root.join("vendor/lib/Cargo.toml"), "[package]\n").unwrap();
        let reg = registry(&root);

        match reg.protection_reason(&root.join("vendor")) {
            Some(ProtectionReason::ContainsProtected(p)) => assert!(p.ends_with("Cargo.toml")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!reg.is_protected(&root.join("src")));
    }

    #[test]
    fn near_protected_ignores_project_root() {
        let (_temp, root) = project();
        std::fs::write(root.join("debug.log"), "x").unwrap();
        std::fs::create_dir_all(root.join("packages/web")).unwrap();
        std::fs::write(root.join("packages/web/package.json"), "{}").unwrap();
        std::fs::write(root.join("packages/web/debug.log"), "x").unwrap();
        let reg = registry(&root);

        assert!(!reg.is_near_protected(&root.join("debug.log")));
        assert!(reg.is_near_protected(&root.join("packages/web/debug.log")));
        assert!(!reg.is_near_protected(&root.join("src/app.py")));
    }

    #[test]
    fn protected_entries_lists_matching_children() {
        let (_temp, root) = project();
        std::fs::write(root.join("notes.txt"), "x").unwrap();
        let reg = registry(&root);

        let entries = reg.protected_entries(&root);
        assert!(entries.contains(&root.join("pyproject.toml")));
        assert!(entries.contains(&root.join(".git")));
        assert!(!entries.contains(&root.join("notes.txt")));
        assert!(reg.protected_entries(&root.join("missing")).is_empty());
    }

    #[test]
    fn custom_patterns_apply() {
        let (_temp, root) = project();
        let mut patterns = default_protected_patterns();
        patterns.push("secrets/**".to_string());
        let reg = ProtectedPaths::from_patterns(&root, &patterns).unwrap();

        assert!(reg.is_protected(&root.join("secrets/key.pem")));
    }

    #[test]
    fn invalid_pattern_is_error() {
        let err = ProtectedPaths::from_patterns("/tmp", &["[".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid protected pattern"));
    }

    #[test]
    fn normalize_lexically_resolves_parent_dirs() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }
}
