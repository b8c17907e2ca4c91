//! Error types for tix Validate
//!
//! [`ValidateError`] covers failures that stop a validation call outright.
//! Mismatches are not errors; they come back as failed outcomes carrying
//! [`EntityError`] reasons.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use tix_batch::BatchError;
use tix_playbook::PlaybookError;

/// Result alias for validation operations
pub type ValidateResult<T> = Result<T, ValidateError>;

/// Failure that prevents validation from running
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Store read failed
    #[error(transparent)]
    Playbook(#[from] PlaybookError),

    /// Batch log could not be read
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Remote API call failed in transport
    #[error("api {op} failed: {reason}")]
    Api {
        /// API call that failed
        op: &'static str,
        /// Transport message
        reason: String,
    },

    /// Validation file could not be read
    #[error("{path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Validation file is not an array of entities
    #[error("{path} is not a valid entity file: {source}")]
    Json {
        /// File being parsed
        path: PathBuf,
        /// Parser failure
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),
}

impl ValidateError {
    /// Create API transport error
    #[inline]
    #[must_use]
    pub fn api(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Api {
            op,
            reason: reason.into(),
        }
    }

    /// Create I/O error for a path
    #[inline]
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Typed reason an entity failed validation
///
/// `Display` renders the log line, prefixed by the reason kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    /// Entity could not be resolved or fetched
    NotFound {
        /// Entity type
        kind: String,
        /// Name, summary or id used for the lookup
        label: String,
    },
    /// Attribute discrepancy
    Attribute(String),
    /// Tag discrepancy
    Tag(String),
    /// Security label discrepancy
    SecurityLabel(String),
    /// Indicator rating differs
    Rating {
        /// Rating in the validation data
        provided: Option<f64>,
        /// Rating on the platform
        actual: Option<f64>,
    },
    /// Indicator confidence differs
    Confidence {
        /// Confidence in the validation data
        provided: Option<i64>,
        /// Confidence on the platform
        actual: Option<i64>,
    },
    /// Name or summary differs
    Summary {
        /// Name or summary in the validation data
        provided: String,
        /// Name or summary on the platform
        actual: String,
    },
    /// File count differs from entity count
    Length,
    /// Attached file digest differs
    Digest {
        /// SHA-256 of the local file
        provided: String,
        /// SHA-256 of the downloaded content
        actual: String,
    },
}

impl EntityError {
    /// Reason kind, as used in log prefixes
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::Attribute(_) => "AttributeError",
            Self::Tag(_) => "TagError",
            Self::SecurityLabel(_) => "SecurityLabelError",
            Self::Rating { .. } => "RatingError",
            Self::Confidence { .. } => "ConfidenceError",
            Self::Summary { .. } => "SummaryError",
            Self::Length => "LengthError",
            Self::Digest { .. } => "DigestError",
        }
    }
}

struct Shown<'a, T>(&'a Option<T>);

impl<T: Display> Display for Shown<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, label } => write!(
                f,
                "NotFoundError: Provided {kind}: {label} could not be fetched from ThreatConnect"
            ),
            Self::Attribute(msg) | Self::Tag(msg) | Self::SecurityLabel(msg) => {
                write!(f, "{}: {msg}", self.kind())
            }
            Self::Rating { provided, actual } => write!(
                f,
                "RatingError: Provided rating {} does not match actual rating {}",
                Shown(provided),
                Shown(actual)
            ),
            Self::Confidence { provided, actual } => write!(
                f,
                "ConfidenceError: Provided confidence {} does not match actual confidence {}",
                Shown(provided),
                Shown(actual)
            ),
            Self::Summary { provided, actual } => write!(
                f,
                "SummaryError: Provided summary {provided} does not match actual summary {actual}"
            ),
            Self::Length => f.write_str(
                "LengthError: Length of files provided does not match length of entities provided.",
            ),
            Self::Digest { provided, actual } => write!(
                f,
                "sha256 {provided} of provided file did not match sha256 of actual file {actual}"
            ),
        }
    }
}
