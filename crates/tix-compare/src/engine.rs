//! Comparison engine
//!
//! Provides [`ComparisonEngine`], which dispatches an operator token to a
//! pure comparison and returns a [`ComparisonResult`]. Failures of any kind,
//! unknown operators included, come back as failed results.

use crate::diff::{deep_diff, eq_details};
use crate::error::CompareError;
use crate::operator::{Operator, OperatorRegistry};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// Outcome of one comparison
///
/// `details` is empty when `passed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Whether the comparison held
    pub passed: bool,
    /// Why it did not
    pub details: String,
}

impl ComparisonResult {
    /// Passed comparison
    #[inline]
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            details: String::new(),
        }
    }

    /// Failed comparison
    #[inline]
    #[must_use]
    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
        }
    }

    fn from_check(passed: bool, details: impl FnOnce() -> String) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail(details())
        }
    }
}

impl From<CompareError> for ComparisonResult {
    fn from(err: CompareError) -> Self {
        Self::fail(err.to_string())
    }
}

/// Per-call comparison options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Top-level object keys dropped before `jeq`
    pub exclude: Vec<String>,
    /// Key/value entries dropped (by `key`) before `kveq`
    pub exclude_keys: Vec<String>,
}

impl CompareOptions {
    /// Create empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With excluded top-level keys
    #[must_use]
    pub fn with_exclude<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.exclude = keys.into_iter().map(Into::into).collect();
        self
    }

    /// With excluded key/value keys
    #[must_use]
    pub fn with_exclude_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.exclude_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Dispatches comparison operators
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    registry: OperatorRegistry,
    max_diff: usize,
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ComparisonEngine {
    /// Create engine with the default token table
    #[must_use]
    pub fn new(max_diff: usize) -> Self {
        Self {
            registry: OperatorRegistry::with_defaults(),
            max_diff,
        }
    }

    /// With a custom token table
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Maximum differences listed in `eq` details
    #[inline]
    #[must_use]
    pub fn max_diff(&self) -> usize {
        self.max_diff
    }

    /// Token table
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Resolve an operator token
    ///
    /// # Errors
    /// Returns [`CompareError::UnknownOperator`] for unregistered tokens.
    pub fn operator(&self, token: &str) -> Result<Operator, CompareError> {
        self.registry.resolve(token)
    }

    /// Compare by operator token
    ///
    /// An unknown token is logged and fails.
    #[must_use]
    pub fn compare(&self, token: &str, app: &Value, test: &Value, options: &CompareOptions) -> ComparisonResult {
        match self.operator(token) {
            Ok(op) => self.apply(op, app, test, options),
            Err(err) => {
                tracing::error!(operator = token, "{err}");
                err.into()
            }
        }
    }

    /// Compare with a resolved operator
    #[must_use]
    pub fn apply(&self, op: Operator, app: &Value, test: &Value, options: &CompareOptions) -> ComparisonResult {
        match op {
            Operator::Eq => self.eq(app, test),
            Operator::Ne => self.ne(app, test),
            Operator::Lt => self.lt(app, test),
            Operator::Le => self.le(app, test),
            Operator::Gt => self.gt(app, test),
            Operator::Ge => self.ge(app, test),
            Operator::DeepDiff => self.deep_diff(app, test),
            Operator::JsonEq => self.json_eq(app, test, &options.exclude),
            Operator::KeyValueEq => self.keyvalue_eq(app, test, &options.exclude_keys),
            Operator::Regex => self.regex_match(app, test),
        }
    }

    /// Structural equality with a capped line diff
    #[must_use]
    pub fn eq(&self, app: &Value, test: &Value) -> ComparisonResult {
        ComparisonResult::from_check(app == test, || eq_details(app, test, self.max_diff))
    }

    /// Structural inequality
    #[must_use]
    pub fn ne(&self, app: &Value, test: &Value) -> ComparisonResult {
        ComparisonResult::from_check(app != test, || "App data is equal to test data".to_string())
    }

    /// App data strictly below test data
    #[must_use]
    pub fn lt(&self, app: &Value, test: &Value) -> ComparisonResult {
        ordered(app, test, Ordering::is_lt, "less than")
    }

    /// App data at or below test data
    #[must_use]
    pub fn le(&self, app: &Value, test: &Value) -> ComparisonResult {
        ordered(app, test, Ordering::is_le, "less than or equal to")
    }

    /// App data strictly above test data
    #[must_use]
    pub fn gt(&self, app: &Value, test: &Value) -> ComparisonResult {
        ordered(app, test, Ordering::is_gt, "greater than")
    }

    /// App data at or above test data
    #[must_use]
    pub fn ge(&self, app: &Value, test: &Value) -> ComparisonResult {
        ordered(app, test, Ordering::is_ge, "greater than or equal to")
    }

    /// Order-insensitive deep diff
    #[must_use]
    pub fn deep_diff(&self, app: &Value, test: &Value) -> ComparisonResult {
        let diffs = deep_diff(app, test);
        ComparisonResult::from_check(diffs.is_empty(), || {
            diffs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    /// Deep diff after parsing text inputs as JSON and dropping `exclude`
    /// top-level keys from both sides
    #[must_use]
    pub fn json_eq(&self, app: &Value, test: &Value, exclude: &[String]) -> ComparisonResult {
        let parsed = parse_json("app", app).and_then(|a| parse_json("test", test).map(|t| (a, t)));
        let (mut app, mut test) = match parsed {
            Ok(pair) => pair,
            Err(err) => return err.into(),
        };
        for key in exclude {
            if let Value::Object(map) = &mut app {
                map.remove(key);
            }
            if let Value::Object(map) = &mut test {
                map.remove(key);
            }
        }
        self.deep_diff(&app, &test)
    }

    /// Deep diff of key/value arrays without entries whose `key` is excluded
    #[must_use]
    pub fn keyvalue_eq(&self, app: &Value, test: &Value, exclude_keys: &[String]) -> ComparisonResult {
        if exclude_keys.is_empty() {
            return self.deep_diff(app, test);
        }
        self.deep_diff(&drop_keys(app, exclude_keys), &drop_keys(test, exclude_keys))
    }

    /// Unanchored match of app data against the test pattern
    ///
    /// Non-text app data is matched in its compact JSON form.
    #[must_use]
    pub fn regex_match(&self, app: &Value, test: &Value) -> ComparisonResult {
        let pattern = match test {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(err) => {
                return CompareError::InvalidRegex {
                    pattern,
                    reason: err.to_string(),
                }
                .into()
            }
        };
        let haystack = match app {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ComparisonResult::from_check(regex.is_match(&haystack), || {
            format!("app_data did not match regex ({pattern})")
        })
    }
}

fn ordered(app: &Value, test: &Value, holds: fn(Ordering) -> bool, relation: &str) -> ComparisonResult {
    match order(app, test) {
        Some(ordering) => ComparisonResult::from_check(holds(ordering), || {
            format!("App data is not {relation} test data")
        }),
        None => ComparisonResult::fail(format!("App data cannot be ordered against test data ({relation})")),
    }
}

/// Numbers (and numeric text) compare numerically, other text
/// lexicographically; anything else has no order
fn order(app: &Value, test: &Value) -> Option<Ordering> {
    if let (Some(a), Some(t)) = (as_number(app), as_number(test)) {
        return a.partial_cmp(&t);
    }
    match (app, test) {
        (Value::String(a), Value::String(t)) => Some(a.cmp(t)),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parse_json(side: &'static str, value: &Value) -> Result<Value, CompareError> {
    match value {
        Value::String(text) => serde_json::from_str(text).map_err(|e| CompareError::InvalidJson {
            side,
            reason: e.to_string(),
        }),
        other => Ok(other.clone()),
    }
}

fn drop_keys(value: &Value, exclude_keys: &[String]) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|item| {
                    item.get("key")
                        .and_then(Value::as_str)
                        .map_or(true, |k| !exclude_keys.iter().any(|e| e == k))
                })
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    }
}
