//! Validator configuration
//!
//! Provides [`ValidatorConfig`], loaded from TOML or JSON like the playbook
//! configuration.

use crate::error::{ValidateError, ValidateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tix_batch::INDICATOR_TYPES;

/// Validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Most line differences listed by `eq`
    pub max_diff: usize,
    /// Width at which logged values are truncated
    pub truncate: usize,
    /// Root holding per-context batch logs
    pub log_root: PathBuf,
    /// Seed for batch sampling
    pub sample_seed: u64,
    /// Indicator types beyond the built-ins
    pub custom_indicator_types: Vec<String>,
}

impl ValidatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With diff limit
    #[inline]
    #[must_use]
    pub fn with_max_diff(mut self, max_diff: usize) -> Self {
        self.max_diff = max_diff;
        self
    }

    /// With truncation width
    #[inline]
    #[must_use]
    pub fn with_truncate(mut self, width: usize) -> Self {
        self.truncate = width;
        self
    }

    /// With batch log root
    #[inline]
    #[must_use]
    pub fn with_log_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.log_root = root.into();
        self
    }

    /// With sampling seed
    #[inline]
    #[must_use]
    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = seed;
        self
    }

    /// With custom indicator types
    #[must_use]
    pub fn with_custom_indicator_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.custom_indicator_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Check if a type is a built-in or custom indicator type
    #[must_use]
    pub fn is_indicator_type(&self, kind: &str) -> bool {
        INDICATOR_TYPES.contains(&kind) || self.custom_indicator_types.iter().any(|t| t == kind)
    }

    /// Batch log directory of an execution context
    #[inline]
    #[must_use]
    pub fn log_dir(&self, context: &str) -> PathBuf {
        self.log_root.join(context)
    }

    /// Parse configuration from TOML
    ///
    /// # Errors
    /// Returns [`ValidateError::Config`] on invalid TOML.
    pub fn from_toml_str(s: &str) -> ValidateResult<Self> {
        toml::from_str(s).map_err(|e| ValidateError::Config(e.to_string()))
    }

    /// Parse configuration from JSON
    ///
    /// # Errors
    /// Returns [`ValidateError::Config`] on invalid JSON.
    pub fn from_json_str(s: &str) -> ValidateResult<Self> {
        serde_json::from_str(s).map_err(|e| ValidateError::Config(e.to_string()))
    }

    /// Load configuration from a `.toml` or `.json` file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> ValidateResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ValidateError::io(path, e))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ValidateError::Config(format!(
                "unsupported config extension {other:?} for {}",
                path.display()
            ))),
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_diff: 10,
            truncate: 50,
            log_root: PathBuf::from("./log"),
            sample_seed: 42,
            custom_indicator_types: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.max_diff, 10);
        assert_eq!(config.truncate, 50);
        assert_eq!(config.sample_seed, 42);
        assert_eq!(config.log_dir("ctx"), PathBuf::from("./log/ctx"));
    }

    #[test]
    fn custom_indicator_types_from_toml() {
        let config = ValidatorConfig::from_toml_str(
            r#"
            max_diff = 3
            custom_indicator_types = ["Hashtag"]
            "#,
        )
        .unwrap();
        assert_eq!(config.max_diff, 3);
        assert_eq!(config.truncate, 50);
        assert!(config.is_indicator_type("Hashtag"));
        assert!(config.is_indicator_type("Host"));
        assert!(!config.is_indicator_type("Adversary"));
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validate.json");
        std::fs::write(&path, r#"{"sample_seed": 7}"#).unwrap();
        assert_eq!(ValidatorConfig::load(&path).unwrap().sample_seed, 7);
        let other = dir.path().join("validate.ini");
        std::fs::write(&other, "").unwrap();
        assert!(matches!(ValidatorConfig::load(&other), Err(ValidateError::Config(_))));
    }
}
