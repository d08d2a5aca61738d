//! Risk scoring for cleanup operations.
//!
//! Scoring happens in two steps: [`RiskFactors::gather`] measures an
//! operation against the filesystem, the dependency report and the
//! protected-path registry; [`assess_factors`] turns those measurements into
//! a [`RiskAssessment`] using a fixed weight and threshold table. The second
//! step is pure, which keeps monotonicity easy to test.

use crate::dependency::DependencyReport;
use crate::fs::path_size;
use crate::operation::{CleanupOperation, ConfirmationLevel, RiskLevel};
use crate::protected::ProtectedPaths;
use serde::{Deserialize, Serialize};

const WEIGHT_PER_TARGET: f64 = 1.0;
const WEIGHT_PER_MB: f64 = 0.5;
const WEIGHT_TARGET_WITH_DEPENDENTS: f64 = 10.0;
const WEIGHT_PER_DEPENDENT: f64 = 1.0;
const WEIGHT_NEAR_PROTECTED: f64 = 15.0;
const WEIGHT_SOURCE_LIKE: f64 = 2.0;

const MEDIUM_THRESHOLD: f64 = 10.0;
const HIGH_THRESHOLD: f64 = 25.0;
const CRITICAL_THRESHOLD: f64 = 60.0;

/// Configuration-style extensions that count as source-like in addition
/// to the configured dependency extensions.
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json", "ini", "cfg", "conf", "env"];

/// Outcome of risk scoring for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: f64,
    pub confirmation_required: ConfirmationLevel,
    pub manual_override_required: bool,
    pub factors: Vec<String>,
}

/// Raw measurements feeding the score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskFactors {
    pub target_count: usize,
    pub total_bytes: u64,
    pub targets_with_dependents: usize,
    pub dependent_count: usize,
    pub near_protected_count: usize,
    pub source_like_count: usize,
    /// Highest discovery risk recorded for any target.
    pub discovery_risk: Option<RiskLevel>,
}

impl RiskFactors {
    /// Measure `operation` against the filesystem and analysis results.
    pub fn gather(
        operation: &CleanupOperation,
        report: &DependencyReport,
        protected: &ProtectedPaths,
        source_extensions: &[String],
    ) -> Self {
        let mut factors = RiskFactors {
            target_count: operation.targets.len(),
            ..Default::default()
        };

        for target in &operation.targets {
            factors.total_bytes += path_size(target);

            let refs = report.for_target(target);
            if !refs.is_empty() {
                factors.targets_with_dependents += 1;
                factors.dependent_count += refs.len();
            }

            if protected.is_near_protected(target) {
                factors.near_protected_count += 1;
            }

            if is_source_like(target, source_extensions) {
                factors.source_like_count += 1;
            }

            if let Some(risk) = operation.discovery_risk(target) {
                factors.discovery_risk = factors.discovery_risk.max(Some(risk));
            }
        }

        factors
    }
}

fn is_source_like(path: &std::path::Path, source_extensions: &[String]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
        return false;
    };
    source_extensions.contains(&ext) || CONFIG_EXTENSIONS.contains(&ext.as_str())
}

/// Map a score onto the threshold table.
pub fn level_for_score(score: f64) -> RiskLevel {
    if score < MEDIUM_THRESHOLD {
        RiskLevel::Low
    } else if score < HIGH_THRESHOLD {
        RiskLevel::Medium
    } else if score < CRITICAL_THRESHOLD {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Confirmation demanded by a risk level before any policy adjustment.
pub fn confirmation_for_level(level: RiskLevel) -> ConfirmationLevel {
    match level {
        RiskLevel::Safe | RiskLevel::Low => ConfirmationLevel::None,
        RiskLevel::Medium => ConfirmationLevel::Simple,
        RiskLevel::High | RiskLevel::Critical => ConfirmationLevel::Complex,
    }
}

/// Turn measurements into an assessment.
pub fn assess_factors(factors: &RiskFactors) -> RiskAssessment {
    let mut score = 0.0;
    let mut forced = RiskLevel::Low;
    let mut notes = Vec::new();

    let total_mb = factors.total_bytes as f64 / (1024.0 * 1024.0);
    score += factors.target_count as f64 * WEIGHT_PER_TARGET;
    score += total_mb * WEIGHT_PER_MB;
    notes.push(format!(
        "{} target(s), {:.2} MB total",
        factors.target_count, total_mb
    ));

    if factors.targets_with_dependents > 0 {
        score += factors.targets_with_dependents as f64 * WEIGHT_TARGET_WITH_DEPENDENTS;
        score += factors.dependent_count as f64 * WEIGHT_PER_DEPENDENT;
        forced = forced.max(RiskLevel::Medium);
        notes.push(format!(
            "{} target(s) referenced by {} file(s)",
            factors.targets_with_dependents, factors.dependent_count
        ));
    }

    if factors.near_protected_count > 0 {
        score += factors.near_protected_count as f64 * WEIGHT_NEAR_PROTECTED;
        forced = forced.max(RiskLevel::High);
        notes.push(format!(
            "{} target(s) next to protected paths",
            factors.near_protected_count
        ));
    }

    if factors.source_like_count > 0 {
        score += factors.source_like_count as f64 * WEIGHT_SOURCE_LIKE;
        notes.push(format!(
            "{} source or config file(s)",
            factors.source_like_count
        ));
    }

    if let Some(discovered) = factors.discovery_risk
        && discovered >= RiskLevel::High
    {
        forced = forced.max(discovered);
        notes.push(format!("discovery classified a target as {}", discovered));
    }

    let level = level_for_score(score).max(forced);

    RiskAssessment {
        level,
        score,
        confirmation_required: confirmation_for_level(level),
        manual_override_required: level == RiskLevel::Critical,
        factors: notes,
    }
}

/// Measure and score an operation in one call.
pub fn assess(
    operation: &CleanupOperation,
    report: &DependencyReport,
    protected: &ProtectedPaths,
    source_extensions: &[String],
) -> RiskAssessment {
    assess_factors(&RiskFactors::gather(
        operation,
        report,
        protected,
        source_extensions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;
    use crate::test_support::TestProject;
    use std::collections::BTreeMap;

    fn factors(targets: usize, bytes: u64, with_deps: usize, deps: usize) -> RiskFactors {
        RiskFactors {
            target_count: targets,
            total_bytes: bytes,
            targets_with_dependents: with_deps,
            dependent_count: deps,
            ..Default::default()
        }
    }

    #[test]
    fn single_small_file_is_low() {
        let assessment = assess_factors(&factors(1, 10, 0, 0));

        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.confirmation_required, ConfirmationLevel::None);
        assert!(!assessment.manual_override_required);
    }

    #[test]
    fn fifteen_targets_are_at_least_medium() {
        let assessment = assess_factors(&factors(15, 15 * 10, 0, 0));
        assert!(assessment.level >= RiskLevel::Medium);
        assert_eq!(assessment.confirmation_required, ConfirmationLevel::Simple);
    }

    #[test]
    fn dependents_force_medium() {
        let assessment = assess_factors(&factors(1, 10, 1, 1));
        assert!(assessment.level >= RiskLevel::Medium);
        assert!(assessment.factors.iter().any(|f| f.contains("referenced by")));
    }

    #[test]
    fn near_protected_forces_high() {
        let assessment = assess_factors(&RiskFactors {
            target_count: 1,
            near_protected_count: 1,
            ..Default::default()
        });
        assert!(assessment.level >= RiskLevel::High);
        assert_eq!(assessment.confirmation_required, ConfirmationLevel::Complex);
    }

    #[test]
    fn discovery_risk_high_forces_level() {
        let assessment = assess_factors(&RiskFactors {
            target_count: 1,
            discovery_risk: Some(RiskLevel::Critical),
            ..Default::default()
        });
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment.manual_override_required);

        let low = assess_factors(&RiskFactors {
            target_count: 1,
            discovery_risk: Some(RiskLevel::Medium),
            ..Default::default()
        });
        assert_eq!(low.level, RiskLevel::Low);
    }

    #[test]
    fn large_size_reaches_critical() {
        let gigabyte = 1024 * 1024 * 1024;
        let assessment = assess_factors(&factors(1, gigabyte, 0, 0));
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn level_never_decreases_with_more_targets_size_or_dependents() {
        let mut previous = assess_factors(&factors(1, 0, 0, 0));
        for step in 1..200usize {
            let current = assess_factors(&factors(step, step as u64 * 512 * 1024, 0, 0));
            assert!(current.level >= previous.level, "targets/size step {}", step);
            assert!(current.score >= previous.score);
            previous = current;
        }

        let mut previous = assess_factors(&factors(3, 1000, 1, 1));
        for deps in 2..100usize {
            let current = assess_factors(&factors(3, 1000, 1, deps));
            assert!(current.level >= previous.level, "dependents step {}", deps);
            previous = current;
        }
    }

    #[test]
    fn threshold_table() {
        assert_eq!(level_for_score(0.0), RiskLevel::Low);
        assert_eq!(level_for_score(9.99), RiskLevel::Low);
        assert_eq!(level_for_score(10.0), RiskLevel::Medium);
        assert_eq!(level_for_score(25.0), RiskLevel::High);
        assert_eq!(level_for_score(60.0), RiskLevel::Critical);
    }

    #[test]
    fn gather_measures_filesystem() {
        let project = TestProject::new();
        let target = project.write("build/out.bin", &"x".repeat(2048));
        let source = project.write("src/lib.py", "x = 1\n");
        let referrer = project.write("main.py", "import lib\n");

        let op = CleanupOperation::new(
            OperationType::Delete,
            vec![target.clone(), source.clone()],
            "test",
        )
        .unwrap()
        .with_target_risk(BTreeMap::from([(target.clone(), RiskLevel::Low)]));

        let report = DependencyReport {
            references: BTreeMap::from([
                (target.clone(), Vec::new()),
                (source.clone(), vec![referrer]),
            ]),
        };
        let protected = ProtectedPaths::new(&project.ctx, &project.config).unwrap();

        let factors = RiskFactors::gather(
            &op,
            &report,
            &protected,
            &project.config.normalized_extensions(),
        );

        assert_eq!(factors.target_count, 2);
        assert!(factors.total_bytes >= 2048);
        assert_eq!(factors.targets_with_dependents, 1);
        assert_eq!(factors.dependent_count, 1);
        assert_eq!(factors.source_like_count, 1);
        assert_eq!(factors.discovery_risk, Some(RiskLevel::Low));
        assert_eq!(factors.near_protected_count, 0);
    }

    #[test]
    fn assessment_serializes_for_event_log() {
        let assessment = assess_factors(&factors(1, 10, 0, 0));
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["level"], "low");
        assert_eq!(json["confirmation_required"], "none");
    }
}
