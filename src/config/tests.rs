//! Tests for config functionality.

use crate::config::Config;
use crate::config::types::{default_dependency_extensions, default_protected_patterns};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(!config.strict_mode);
    assert!(config.require_confirmation_for_medium_risk);
    assert!(config.auto_rollback_on_failure);
    assert!(config.dependency_analysis);
    assert!(config.post_validation);
    assert_eq!(config.confirmation_timeout_seconds, 30);
    assert_eq!(config.max_confirmation_timeout_seconds, 300);
    assert_eq!(config.backup_retention_days, 30);
    assert_eq!(config.lock_stale_minutes, 60);
    assert!(config.protected_patterns.is_empty());
    assert_eq!(config.dependency_extensions, default_dependency_extensions());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    assert!(!config.strict_mode);
    assert_eq!(config.confirmation_timeout_seconds, 30);
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
strict_mode: true
confirmation_timeout_seconds: 10
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert!(config.strict_mode);
    assert_eq!(config.confirmation_timeout_seconds, 10);

    // Unspecified values should use defaults
    assert!(config.auto_rollback_on_failure);
    assert_eq!(config.backup_retention_days, 30);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
strict_mode: true
require_confirmation_for_medium_risk: false
auto_rollback_on_failure: false
dependency_analysis: false
post_validation: false
confirmation_timeout_seconds: 5
max_confirmation_timeout_seconds: 50
protected_patterns:
  - "secrets/**"
dependency_extensions:
  - py
max_dependency_file_bytes: 2048
scan_max_files: 100
backup_retention_days: 7
lock_stale_minutes: 15
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert!(config.strict_mode);
    assert!(!config.require_confirmation_for_medium_risk);
    assert!(!config.auto_rollback_on_failure);
    assert!(!config.dependency_analysis);
    assert!(!config.post_validation);
    assert_eq!(config.confirmation_timeout_seconds, 5);
    assert_eq!(config.max_confirmation_timeout_seconds, 50);
    assert_eq!(config.protected_patterns, vec!["secrets/**"]);
    assert_eq!(config.dependency_extensions, vec!["py"]);
    assert_eq!(config.max_dependency_file_bytes, 2048);
    assert_eq!(config.scan_max_files, 100);
    assert_eq!(config.backup_retention_days, 7);
    assert_eq!(config.lock_stale_minutes, 15);
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
strict_mode: true
some_future_field: 42
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(config.strict_mode);
}

#[test]
fn test_zero_timeout_rejected() {
    let err = Config::from_yaml("confirmation_timeout_seconds: 0").unwrap_err();
    assert!(err.to_string().contains("confirmation_timeout_seconds"));
}

#[test]
fn test_cap_below_base_rejected() {
    let yaml = r#"
confirmation_timeout_seconds: 60
max_confirmation_timeout_seconds: 30
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("max_confirmation_timeout_seconds"));
}

#[test]
fn test_leading_dot_extension_rejected() {
    let yaml = r#"
dependency_extensions:
  - .rs
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("leading dots"));
}

#[test]
fn test_invalid_protected_glob_rejected() {
    let yaml = r#"
protected_patterns:
  - "src/[unclosed"
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("invalid protected pattern"));
}

#[test]
fn test_all_protected_patterns_extends_defaults() {
    let config = Config {
        protected_patterns: vec!["secrets/**".to_string(), "Cargo.toml".to_string()],
        ..Default::default()
    };

    let all = config.all_protected_patterns();
    assert_eq!(all.len(), default_protected_patterns().len() + 1);
    assert!(all.contains(&"secrets/**".to_string()));
    assert!(all.contains(&"pyproject.toml".to_string()));
}

#[test]
fn test_save_and_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.yaml");

    let config = Config {
        strict_mode: true,
        auto_rollback_on_failure: false,
        ..Default::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert!(loaded.strict_mode);
    assert!(!loaded.auto_rollback_on_failure);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_or_default(temp_dir.path().join("config.yaml")).unwrap();
    assert!(!config.strict_mode);
}

#[test]
fn test_load_or_default_invalid_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    std::fs::write(&path, "strict_mode: [not, a, bool]").unwrap();

    assert!(Config::load_or_default(&path).is_err());
}

#[test]
fn test_normalized_extensions() {
    let config = Config {
        dependency_extensions: vec!["RS".to_string(), "Py".to_string()],
        ..Default::default()
    };
    assert_eq!(config.normalized_extensions(), vec!["rs", "py"]);
}
