//! File classification rules for the scanner.

use crate::operation::{RiskLevel, TargetCategory};
use std::path::{Component, Path};

/// Directories whose whole content is regenerable cache.
const CACHE_DIRS: &[&str] = &[
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".cache",
];

/// Build output directories, with the risk of removing files inside them
/// and whether the name counts at any depth. `build`, `dist` and `target`
/// are also common source package names, so they only count at the root.
const BUILD_DIRS: &[(&str, RiskLevel, bool)] = &[
    ("node_modules", RiskLevel::Medium, true),
    ("target", RiskLevel::Low, false),
    ("build", RiskLevel::Low, false),
    ("dist", RiskLevel::Low, false),
];

const OS_METADATA: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// How the scanner judged one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: TargetCategory,
    pub risk: RiskLevel,
    pub reason: String,
}

impl Classification {
    fn new(category: TargetCategory, risk: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            category,
            risk,
            reason: reason.into(),
        }
    }
}

/// Classify a file by its project-relative path.
///
/// Returns `None` for anything that is not a cleanup candidate (source,
/// configuration, documents and everything unrecognized).
pub fn classify(rel: &Path) -> Option<Classification> {
    let dirs: Vec<String> = rel
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(dir) = dirs.iter().find(|d| CACHE_DIRS.contains(&d.as_str())) {
        return Some(Classification::new(
            TargetCategory::Cache,
            RiskLevel::Safe,
            format!("inside cache directory {}", dir),
        ));
    }

    let name = rel.file_name()?.to_string_lossy().to_string();
    let ext = rel
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext == "pyc" || ext == "pyo" {
        return Some(Classification::new(
            TargetCategory::Cache,
            RiskLevel::Safe,
            "compiled Python bytecode",
        ));
    }

    for (build_dir, risk, any_depth) in BUILD_DIRS {
        let matched = if *any_depth {
            dirs.iter().any(|d| d == build_dir)
        } else {
            dirs.first().is_some_and(|d| d == build_dir)
        };
        if matched {
            return Some(Classification::new(
                TargetCategory::BuildArtifact,
                *risk,
                format!("inside build output directory {}", build_dir),
            ));
        }
    }

    if OS_METADATA.contains(&name.as_str()) {
        return Some(Classification::new(
            TargetCategory::OsMetadata,
            RiskLevel::Safe,
            "operating system metadata",
        ));
    }

    if name.ends_with('~') || ext == "swp" || ext == "swo" {
        return Some(Classification::new(
            TargetCategory::Editor,
            RiskLevel::Safe,
            "editor swap or backup file",
        ));
    }

    match ext.as_str() {
        "tmp" | "temp" => Some(Classification::new(
            TargetCategory::Temp,
            RiskLevel::Safe,
            "temporary file",
        )),
        "log" => Some(Classification::new(
            TargetCategory::Log,
            RiskLevel::Low,
            "log file",
        )),
        "bak" | "orig" | "old" => Some(Classification::new(
            TargetCategory::BackupFile,
            RiskLevel::Low,
            "stale backup copy",
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(rel: &str) -> Option<(TargetCategory, RiskLevel)> {
        classify(Path::new(rel)).map(|c| (c.category, c.risk))
    }

    #[test]
    fn caches_are_safe() {
        assert_eq!(
            category("src/__pycache__/mod.cpython-312.pyc"),
            Some((TargetCategory::Cache, RiskLevel::Safe))
        );
        assert_eq!(
            category("lib/old.pyc"),
            Some((TargetCategory::Cache, RiskLevel::Safe))
        );
        assert_eq!(
            category(".pytest_cache/v/cache/nodeids"),
            Some((TargetCategory::Cache, RiskLevel::Safe))
        );
    }

    #[test]
    fn temp_editor_and_os_files_are_safe() {
        assert_eq!(category("a.tmp"), Some((TargetCategory::Temp, RiskLevel::Safe)));
        assert_eq!(category("notes.txt~"), Some((TargetCategory::Editor, RiskLevel::Safe)));
        assert_eq!(category(".main.rs.swp"), Some((TargetCategory::Editor, RiskLevel::Safe)));
        assert_eq!(
            category("docs/.DS_Store"),
            Some((TargetCategory::OsMetadata, RiskLevel::Safe))
        );
    }

    #[test]
    fn logs_and_backups_are_low() {
        assert_eq!(category("logs/app.log"), Some((TargetCategory::Log, RiskLevel::Low)));
        assert_eq!(
            category("settings.py.orig"),
            Some((TargetCategory::BackupFile, RiskLevel::Low))
        );
    }

    #[test]
    fn build_output_risk_depends_on_directory() {
        assert_eq!(
            category("dist/app.js"),
            Some((TargetCategory::BuildArtifact, RiskLevel::Low))
        );
        assert_eq!(
            category("web/node_modules/left-pad/index.js"),
            Some((TargetCategory::BuildArtifact, RiskLevel::Medium))
        );
    }

    #[test]
    fn nested_build_names_are_source_packages() {
        assert_eq!(category("src/build/helpers.py"), None);
        assert_eq!(category("tools/dist/release.sh"), None);
        assert_eq!(
            category("build/lib/helpers.py"),
            Some((TargetCategory::BuildArtifact, RiskLevel::Low))
        );
        assert_eq!(
            category("src/build/__pycache__/helpers.cpython-312.pyc"),
            Some((TargetCategory::Cache, RiskLevel::Safe))
        );
    }

    #[test]
    fn source_and_config_are_not_candidates() {
        assert_eq!(category("src/main.rs"), None);
        assert_eq!(category("config/settings.yaml"), None);
        assert_eq!(category("README.md"), None);
    }
}
