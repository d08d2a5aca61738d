//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::default_protected_patterns;
use crate::error::{GuardError, Result};
use crate::fs::atomic_write_file;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(GuardError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config if the file exists, otherwise return defaults.
    ///
    /// A present but invalid file is still an error: silently falling back to
    /// defaults would quietly drop `strict_mode`.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            GuardError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate and atomically write the config to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let yaml = self.to_yaml()?;
        atomic_write_file(path, &yaml)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - timeouts must be positive and the base must not exceed the cap
    /// - `backup_retention_days` and `lock_stale_minutes` must be positive
    /// - `dependency_extensions` entries must be non-empty and have no leading dots
    /// - `protected_patterns` must be valid globs
    pub fn validate(&self) -> Result<()> {
        if self.confirmation_timeout_seconds == 0 {
            return Err(GuardError::UserError(
                "config validation failed: confirmation_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        if self.max_confirmation_timeout_seconds < self.confirmation_timeout_seconds {
            return Err(GuardError::UserError(format!(
                "config validation failed: max_confirmation_timeout_seconds ({}) must be at least confirmation_timeout_seconds ({})",
                self.max_confirmation_timeout_seconds, self.confirmation_timeout_seconds
            )));
        }

        if self.backup_retention_days == 0 {
            return Err(GuardError::UserError(
                "config validation failed: backup_retention_days must be greater than 0"
                    .to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(GuardError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        for ext in &self.dependency_extensions {
            if ext.is_empty() {
                return Err(GuardError::UserError(
                    "config validation failed: dependency_extensions entries must be non-empty"
                        .to_string(),
                ));
            }
            if ext.starts_with('.') {
                return Err(GuardError::UserError(format!(
                    "config validation failed: dependency_extensions entries must not have leading dots (found '{}'). Use '{}' instead.",
                    ext,
                    ext.trim_start_matches('.')
                )));
            }
        }

        for pattern in &self.protected_patterns {
            globset::Glob::new(pattern).map_err(|e| {
                GuardError::UserError(format!(
                    "config validation failed: invalid protected pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }

    /// Built-in protected patterns followed by the configured extras.
    pub fn all_protected_patterns(&self) -> Vec<String> {
        let mut patterns = default_protected_patterns();
        for pattern in &self.protected_patterns {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }
        patterns
    }

    /// Get dependency_extensions normalized to lowercase.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.dependency_extensions
            .iter()
            .map(|s| s.to_lowercase())
            .collect()
    }
}
