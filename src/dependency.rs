//! Dependency analysis: which project files reference a target.
//!
//! Best-effort textual analysis. A file references a target when it contains
//! the target's file name verbatim, or uses the target's stem in an
//! import-like form (`import x`, `from x`, `mod x`, `use ..x`, `require("..x")`,
//! `#include "..x"`). Dynamic references are missed; coincidental matches
//! only make the pipeline more cautious.
//!
//! Reports are computed fresh for every operation and never cached.

use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{GuardError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory names never searched for referrers.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
];

/// Stems shorter than this only match by full file name.
const MIN_STEM_LEN: usize = 3;

/// Per-target list of referencing files. An empty list means no known referrers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub references: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl DependencyReport {
    /// Referrers of `target` (empty if none or unknown).
    pub fn for_target(&self, target: &Path) -> &[PathBuf] {
        self.references
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any target has at least one referrer.
    pub fn has_dependents(&self) -> bool {
        self.references.values().any(|refs| !refs.is_empty())
    }

    /// Targets with at least one referrer.
    pub fn targets_with_dependents(&self) -> Vec<&Path> {
        self.references
            .iter()
            .filter(|(_, refs)| !refs.is_empty())
            .map(|(target, _)| target.as_path())
            .collect()
    }

    /// Total number of (target, referrer) pairs.
    pub fn dependent_count(&self) -> usize {
        self.references.values().map(Vec::len).sum()
    }
}

/// Searches project source files for references to targets.
#[derive(Debug, Clone)]
pub struct DependencyAnalyzer {
    project_root: PathBuf,
    state_dir: PathBuf,
    extensions: Vec<String>,
    max_file_bytes: u64,
}

/// Compiled matchers for one target.
struct TargetMatcher {
    target: PathBuf,
    file_name: String,
    import_patterns: Vec<Regex>,
}

impl TargetMatcher {
    fn new(target: &Path) -> Result<Self> {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let import_patterns = if stem.chars().count() >= MIN_STEM_LEN {
            import_patterns(&stem)?
        } else {
            Vec::new()
        };

        Ok(Self {
            target: target.to_path_buf(),
            file_name,
            import_patterns,
        })
    }

    fn is_referenced_by(&self, content: &str) -> bool {
        (!self.file_name.is_empty() && content.contains(&self.file_name))
            || self.import_patterns.iter().any(|re| re.is_match(content))
    }

    /// A target never references itself, nor do files inside a directory target.
    fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.target)
    }
}

fn import_patterns(stem: &str) -> Result<Vec<Regex>> {
    let s = regex::escape(stem);
    let sources = [
        format!(r"(?m)^\s*(?:import|from)\s+[\w.]*\b{}\b", s),
        format!(r"(?m)^\s*(?:pub\s+)?mod\s+{}\s*;", s),
        format!(r"(?m)^\s*(?:pub\s+)?use\s+[\w:]*\b{}\b", s),
        format!(r#"require\(\s*['"][^'"]*\b{}\b[^'"]*['"]\s*\)"#, s),
        format!(r#"(?m)^\s*import\s+.*\bfrom\s+['"][^'"]*\b{}\b[^'"]*['"]"#, s),
        format!(r#"(?m)^\s*#\s*include\s*[<"][^>"]*\b{}\b"#, s),
    ];

    sources
        .iter()
        .map(|src| {
            Regex::new(src).map_err(|e| {
                GuardError::UserError(format!(
                    "failed to build reference pattern for '{}': {}",
                    stem, e
                ))
            })
        })
        .collect()
}

impl DependencyAnalyzer {
    /// Build an analyzer for the project using config-driven extensions and caps.
    pub fn new(ctx: &ProjectContext, config: &Config) -> Self {
        Self {
            project_root: ctx.project_root.clone(),
            state_dir: ctx.state_dir.clone(),
            extensions: config.normalized_extensions(),
            max_file_bytes: config.max_dependency_file_bytes,
        }
    }

    /// Find project files that reference `target`.
    pub fn find_references(&self, target: &Path) -> Result<Vec<PathBuf>> {
        let report = self.analyze(std::slice::from_ref(&target.to_path_buf()))?;
        Ok(report.for_target(target).to_vec())
    }

    /// Build a dependency report for every target in one pass over the project.
    pub fn analyze(&self, targets: &[PathBuf]) -> Result<DependencyReport> {
        let matchers = targets
            .iter()
            .map(|t| TargetMatcher::new(t))
            .collect::<Result<Vec<_>>>()?;

        let mut references: BTreeMap<PathBuf, Vec<PathBuf>> = targets
            .iter()
            .map(|t| (t.clone(), Vec::new()))
            .collect();

        for source in self.source_files() {
            let Ok(content) = std::fs::read_to_string(&source) else {
                continue;
            };

            for matcher in &matchers {
                if matcher.owns(&source) || !matcher.is_referenced_by(&content) {
                    continue;
                }
                debug!(
                    target = %matcher.target.display(),
                    referrer = %source.display(),
                    "reference found"
                );
                if let Some(refs) = references.get_mut(&matcher.target) {
                    refs.push(source.clone());
                }
            }
        }

        for refs in references.values_mut() {
            refs.sort();
        }

        Ok(DependencyReport { references })
    }

    /// Candidate referrer files in deterministic order.
    fn source_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.project_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let path = entry.path();
                if path.starts_with(&self.state_dir) {
                    return false;
                }
                if entry.file_type().is_dir() && entry.depth() > 0 {
                    let name = entry.file_name().to_string_lossy();
                    return !SKIPPED_DIRS.contains(&name.as_ref());
                }
                true
            })
            .flatten()
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.has_source_extension(entry.path()))
            .filter(|entry| {
                entry
                    .metadata()
                    .is_ok_and(|m| m.len() <= self.max_file_bytes)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestProject;

    #[test]
    fn finds_python_import() {
        let project = TestProject::new();
        let target = project.write("pkg/helpers.py", "def f(): pass\n");
        let referrer = project.write("app.py", "from pkg.helpers import f\n");
        project.write("other.py", "print('unrelated')\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        let refs = analyzer.find_references(&target).unwrap();

        assert_eq!(refs, vec![referrer]);
    }

    #[test]
    fn finds_verbatim_file_name() {
        let project = TestProject::new();
        let target = project.write("data/seed.csv", "a,b\n");
        let referrer = project.write("load.sh", "cat data/seed.csv\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert_eq!(analyzer.find_references(&target).unwrap(), vec![referrer]);
    }

    #[test]
    fn finds_rust_mod_declaration() {
        let project = TestProject::new();
        let target = project.write("src/parser.rs", "pub fn parse() {}\n");
        let referrer = project.write("src/lib.rs", "pub mod parser;\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert_eq!(analyzer.find_references(&target).unwrap(), vec![referrer]);
    }

    #[test]
    fn finds_js_require() {
        let project = TestProject::new();
        let target = project.write("lib/format.js", "module.exports = {};\n");
        let referrer = project.write("index.js", "const f = require('./lib/format');\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert_eq!(analyzer.find_references(&target).unwrap(), vec![referrer]);
    }

    #[test]
    fn unreferenced_target_has_empty_report() {
        let project = TestProject::new();
        let target = project.write("scratch/notes.tmp", "x");
        project.write("main.py", "print('hello')\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        let report = analyzer.analyze(std::slice::from_ref(&target)).unwrap();

        assert!(report.for_target(&target).is_empty());
        assert!(!report.has_dependents());
        assert_eq!(report.dependent_count(), 0);
    }

    #[test]
    fn target_does_not_reference_itself() {
        let project = TestProject::new();
        let target = project.write("self_ref.py", "# self_ref.py\nimport self_ref\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert!(analyzer.find_references(&target).unwrap().is_empty());
    }

    #[test]
    fn skips_state_dir_and_vendor_dirs() {
        let project = TestProject::new();
        let target = project.write("util.py", "x = 1\n");
        project.write(".sweepguard/proposals/p.json", "{\"t\": \"util.py\"}");
        project.write("node_modules/pkg/index.js", "require('util.py')");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert!(analyzer.find_references(&target).unwrap().is_empty());
    }

    #[test]
    fn skips_files_above_size_cap() {
        let mut project = TestProject::new();
        project.config.max_dependency_file_bytes = 16;
        let target = project.write("tiny.py", "x = 1\n");
        project.write("big.py", &format!("import tiny\n{}", "#".repeat(64)));

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        assert!(analyzer.find_references(&target).unwrap().is_empty());
    }

    #[test]
    fn analyze_reports_every_target() {
        let project = TestProject::new();
        let a = project.write("a_mod.py", "");
        let b = project.write("b_mod.py", "");
        let user = project.write("main.py", "import a_mod\n");

        let analyzer = DependencyAnalyzer::new(&project.ctx, &project.config);
        let report = analyzer.analyze(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(report.for_target(&a), &[user]);
        assert!(report.for_target(&b).is_empty());
        assert_eq!(report.targets_with_dependents(), vec![a.as_path()]);
    }
}
