//! Error types for tix Playbook
//!
//! Provides error handling for:
//! - Store backend failures
//! - Malformed variables and coercion failures
//! - Store wire decoding
//! - Configuration loading
//! - Input binding

use tix_variable::{AddressError, CoercionError, VariableType};

/// Result alias for playbook operations
pub type PlaybookResult<T> = Result<T, PlaybookError>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a key-value store backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Key holds a different kind of entry
    #[error("key '{key}' holds a {found} entry, expected {expected}")]
    WrongType {
        /// Store key
        key: String,
        /// Entry kind the call needs
        expected: &'static str,
        /// Entry kind actually held
        found: &'static str,
    },

    /// Backend could not complete the call
    #[error("store {op} failed for '{key}': {reason}")]
    Backend {
        /// Store call (`hget`, `hset`, ...)
        op: &'static str,
        /// Key the call addressed
        key: String,
        /// Backend message
        reason: String,
    },
}

impl StoreError {
    /// Create backend error
    #[inline]
    #[must_use]
    pub fn backend(op: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            op,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Main playbook error type
#[derive(Debug, thiserror::Error)]
pub enum PlaybookError {
    /// Malformed variable string
    #[error("malformed variable: {0}")]
    Address(#[from] AddressError),

    /// Value does not fit the declared type
    #[error("invalid value for {variable}: {source}")]
    Coercion {
        /// Variable or input being coerced
        variable: String,
        /// Underlying coercion failure
        #[source]
        source: CoercionError,
    },

    /// Stored bytes could not be decoded
    #[error("cannot decode {variable}: {reason}")]
    Decode {
        /// Variable whose bytes were read
        variable: String,
        /// Decoder message
        reason: String,
    },

    /// Value variant does not match the variable type
    #[error("type mismatch for {variable}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Variable written or read
        variable: String,
        /// Type suffix of the variable
        expected: VariableType,
        /// Type of the supplied value
        found: VariableType,
    },

    /// Store backend failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON encoding failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure while loading configuration
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybookError {
    /// Create coercion error
    #[inline]
    #[must_use]
    pub fn coercion(variable: impl ToString, source: CoercionError) -> Self {
        Self::Coercion {
            variable: variable.to_string(),
            source,
        }
    }

    /// Create decode error
    #[inline]
    #[must_use]
    pub fn decode(variable: impl ToString, reason: impl ToString) -> Self {
        Self::Decode {
            variable: variable.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Check if the failure came from the store backend
    #[inline]
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<toml::de::Error> for PlaybookError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Input binding failure
///
/// Binding stops at the first failing field; no inputs are bound.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A declared field could not be bound
    #[error("cannot bind input '{field}': {source}")]
    Field {
        /// Input field name
        field: String,
        /// Why the field failed
        #[source]
        source: PlaybookError,
    },
}

impl BindError {
    /// Name of the failing field
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Field { field, .. } => field,
        }
    }
}
