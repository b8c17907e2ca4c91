//! tix Compare - Expected-vs-actual comparison
//!
//! Pure data comparison used by validation:
//! - [`Operator`] / [`OperatorRegistry`]: operator tokens and their aliases
//! - [`ComparisonEngine`]: dispatch to eq/ne/ordering/deep-diff/json/key-value/regex
//! - [`deep_diff`]: order-insensitive, path-level structural diff
//! - [`compare_dicts`] / [`compare_lists`]: multiset checks of entity metadata
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tix_compare::{CompareOptions, ComparisonEngine};
//!
//! let engine = ComparisonEngine::new(10);
//! let result = engine.compare("dd", &json!([1, 2]), &json!([2, 1]), &CompareOptions::new());
//! assert!(result.passed);
//! assert!(result.details.is_empty());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod diff;
mod engine;
mod error;
mod operator;
mod structural;

pub use diff::{deep_diff, diff_lines, eq_details, line_diff, DiffKind, Difference, LineOp};
pub use engine::{CompareOptions, ComparisonEngine, ComparisonResult};
pub use error::CompareError;
pub use operator::{Operator, OperatorRegistry};
pub use structural::{compare_dicts, compare_lists};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
