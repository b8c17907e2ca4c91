//! Comparison operators
//!
//! Provides [`Operator`], the closed set of comparison kinds, and
//! [`OperatorRegistry`], which maps textual tokens (including aliases such as
//! `=` or `json_eq`) onto them.

use crate::error::CompareError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Comparison kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Structural equality with a line diff on mismatch
    Eq,
    /// Structural inequality
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Order-insensitive deep diff
    DeepDiff,
    /// Deep diff after parsing text as JSON
    JsonEq,
    /// Deep diff of key/value arrays minus excluded keys
    KeyValueEq,
    /// Unanchored regex match
    Regex,
}

impl Operator {
    /// Every operator
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::DeepDiff,
        Operator::JsonEq,
        Operator::KeyValueEq,
        Operator::Regex,
    ];

    /// Canonical token
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::DeepDiff => "dd",
            Self::JsonEq => "jeq",
            Self::KeyValueEq => "kveq",
            Self::Regex => "rex",
        }
    }

    /// Accepted alias tokens besides the canonical one
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Eq => &["="],
            Self::Ne => &["!="],
            Self::Lt => &["<"],
            Self::Le => &["<="],
            Self::Gt => &[">"],
            Self::Ge => &[">="],
            Self::DeepDiff => &[],
            Self::JsonEq => &["json_eq"],
            Self::KeyValueEq => &["keyvalue_eq"],
            Self::Regex => &[],
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s || op.aliases().contains(&s))
            .ok_or_else(|| CompareError::UnknownOperator(s.to_string()))
    }
}

/// Token table for operator dispatch
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    tokens: IndexMap<String, Operator>,
}

impl OperatorRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: IndexMap::new(),
        }
    }

    /// Create registry with every canonical token and alias
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for op in Operator::ALL {
            registry.register(op.as_str(), op);
            for alias in op.aliases() {
                registry.register(alias, op);
            }
        }
        registry
    }

    /// Register a token, replacing any previous mapping
    pub fn register(&mut self, token: &str, op: Operator) {
        self.tokens.insert(token.to_string(), op);
    }

    /// Remove a token
    #[inline]
    pub fn remove(&mut self, token: &str) -> bool {
        self.tokens.shift_remove(token).is_some()
    }

    /// Resolve a token
    ///
    /// # Errors
    /// Returns [`CompareError::UnknownOperator`] for an unregistered token.
    pub fn resolve(&self, token: &str) -> Result<Operator, CompareError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| CompareError::UnknownOperator(token.to_string()))
    }

    /// Check if a token is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    /// Every registered token
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.tokens.keys().map(String::as_str).collect()
    }

    /// Number of registered tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_with_defaults() {
        let registry = OperatorRegistry::with_defaults();
        assert_eq!(registry.len(), 18);
        for (token, op) in [
            ("eq", Operator::Eq),
            ("=", Operator::Eq),
            ("!=", Operator::Ne),
            ("<=", Operator::Le),
            (">", Operator::Gt),
            ("dd", Operator::DeepDiff),
            ("json_eq", Operator::JsonEq),
            ("keyvalue_eq", Operator::KeyValueEq),
            ("rex", Operator::Regex),
        ] {
            assert_eq!(registry.resolve(token).unwrap(), op, "{token}");
        }
    }

    #[test]
    fn unknown_token() {
        let registry = OperatorRegistry::with_defaults();
        assert_eq!(
            registry.resolve("~=").unwrap_err(),
            CompareError::UnknownOperator("~=".into())
        );
    }

    #[test]
    fn register_custom_alias() {
        let mut registry = OperatorRegistry::new();
        assert!(registry.is_empty());
        registry.register("equals", Operator::Eq);
        assert!(registry.contains("equals"));
        assert!(registry.remove("equals"));
        assert!(!registry.contains("equals"));
    }

    #[test]
    fn from_str_accepts_aliases() {
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Ge);
        assert_eq!("kveq".parse::<Operator>().unwrap(), Operator::KeyValueEq);
        assert!("nope".parse::<Operator>().is_err());
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(Operator::JsonEq.to_string(), "jeq");
    }
}
