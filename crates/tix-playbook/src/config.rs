//! Playbook app configuration
//!
//! Provides [`PlaybookConfig`], loaded from TOML or JSON. The platform sends
//! `""` for unpopulated fields, so empty strings read as absent.

use crate::error::{PlaybookError, PlaybookResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tix_variable::Variable;

/// Playbook execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookConfig {
    /// Execution context id (hash key in the store)
    pub context: String,
    /// Requested output variables
    #[serde(deserialize_with = "comma_or_sequence")]
    pub out_variables: Vec<String>,
    /// Store host
    #[serde(deserialize_with = "empty_as_none")]
    pub kvstore_host: Option<String>,
    /// Store port
    pub kvstore_port: Option<u16>,
    /// Store database index
    pub kvstore_db: Option<u32>,
    /// Store backend kind
    #[serde(deserialize_with = "empty_as_none")]
    pub kvstore_type: Option<String>,
    /// Width at which logged values are truncated
    pub log_truncate: usize,
}

impl PlaybookConfig {
    /// Create configuration for an execution context
    #[inline]
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    /// With requested output variables
    #[must_use]
    pub fn with_out_variables<I, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.out_variables = variables.into_iter().map(Into::into).collect();
        self
    }

    /// With store location
    #[must_use]
    pub fn with_kvstore(mut self, host: impl Into<String>, port: u16) -> Self {
        self.kvstore_host = Some(host.into());
        self.kvstore_port = Some(port);
        self
    }

    /// With log truncation width
    #[inline]
    #[must_use]
    pub fn with_log_truncate(mut self, width: usize) -> Self {
        self.log_truncate = width;
        self
    }

    /// Parse configuration from TOML
    ///
    /// # Errors
    /// Returns [`PlaybookError::Config`] on invalid TOML.
    pub fn from_toml_str(s: &str) -> PlaybookResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse configuration from JSON
    ///
    /// # Errors
    /// Returns [`PlaybookError::Json`] on invalid JSON.
    pub fn from_json_str(s: &str) -> PlaybookResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load configuration from a `.toml` or `.json` file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> PlaybookResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(PlaybookError::Config(format!(
                "unsupported config extension {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// Parse the requested output variables
    ///
    /// # Errors
    /// Returns [`PlaybookError::Address`] for the first malformed entry.
    pub fn output_variables(&self) -> PlaybookResult<Vec<Variable>> {
        self.out_variables
            .iter()
            .map(|raw| Variable::parse(raw).map_err(PlaybookError::from))
            .collect()
    }
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            context: String::new(),
            out_variables: Vec::new(),
            kvstore_host: None,
            kvstore_port: None,
            kvstore_db: None,
            kvstore_type: None,
            log_truncate: 50,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommaOrSequence {
    Joined(String),
    Sequence(Vec<String>),
}

/// Accept `"a,b"` or `["a", "b"]`; blank entries are dropped
fn comma_or_sequence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = match CommaOrSequence::deserialize(deserializer)? {
        CommaOrSequence::Joined(s) => s.split(',').map(str::to_string).collect(),
        CommaOrSequence::Sequence(v) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}
