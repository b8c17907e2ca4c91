//! Error types for tix Compare

/// Comparison setup failures
///
/// The engine turns these into failed comparisons; they never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    /// Operator token is not registered
    #[error("invalid operator provided ({0})")]
    UnknownOperator(String),

    /// Pattern does not compile
    #[error("invalid regex ({pattern}): {reason}")]
    InvalidRegex {
        /// Pattern as given
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Text input is not JSON
    #[error("{side} data is not valid json: {reason}")]
    InvalidJson {
        /// `app` or `test`
        side: &'static str,
        /// Parser message
        reason: String,
    },
}
