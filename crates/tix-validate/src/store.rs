//! Store-side validation
//!
//! Provides [`StoreValidator`], which reads playbook variables from the
//! store and asserts them against expected data with the comparison engine.

use crate::config::ValidatorConfig;
use crate::error::ValidateResult;
use serde_json::Value;
use tix_compare::{CompareOptions, ComparisonEngine};
use tix_playbook::{decode, KvStore, KvStoreClient, PlaybookError};
use tix_variable::{coerce_as, RawValue, Variable, VariableType};
use tracing::{error, info};

/// Result of one store assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the assertion held
    pub passed: bool,
    /// Message for a failed assertion
    pub assert_error: String,
}

impl ValidationOutcome {
    /// Failed outcome with a message
    #[inline]
    #[must_use]
    pub fn fail(assert_error: impl Into<String>) -> Self {
        Self {
            passed: false,
            assert_error: assert_error.into(),
        }
    }
}

/// Truncate long strings in a value for logging
///
/// Top-level strings are cut at `width`. String members of an array are cut
/// and marked with ` ...`.
#[must_use]
pub fn truncate_for_log(value: &Value, width: usize) -> Value {
    fn cut(s: &str, width: usize) -> Option<String> {
        (s.chars().count() > width).then(|| s.chars().take(width).collect())
    }
    match value {
        Value::String(s) => cut(s, width).map_or_else(|| value.clone(), Value::String),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => cut(s, width)
                        .map_or_else(|| item.clone(), |c| Value::String(format!("{c} ..."))),
                    other => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    tix_variable::json_kind(value)
}

/// Asserts playbook variables held in the store
#[derive(Debug)]
pub struct StoreValidator<'a, S> {
    client: &'a KvStoreClient<S>,
    engine: ComparisonEngine,
    truncate: usize,
}

impl<'a, S: KvStore> StoreValidator<'a, S> {
    /// Create validator with default engine and truncation width
    #[must_use]
    pub fn new(client: &'a KvStoreClient<S>) -> Self {
        Self {
            client,
            engine: ComparisonEngine::default(),
            truncate: 50,
        }
    }

    /// Create validator with the diff cap and truncation width of a config
    #[must_use]
    pub fn with_config(client: &'a KvStoreClient<S>, config: &ValidatorConfig) -> Self {
        Self {
            client,
            engine: ComparisonEngine::new(config.max_diff),
            truncate: config.truncate,
        }
    }

    /// With comparison engine
    #[inline]
    #[must_use]
    pub fn with_engine(mut self, engine: ComparisonEngine) -> Self {
        self.engine = engine;
        self
    }

    /// With truncation width for logged values
    #[inline]
    #[must_use]
    pub fn with_truncate(mut self, width: usize) -> Self {
        self.truncate = width;
        self
    }

    /// Comparison engine in use
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &ComparisonEngine {
        &self.engine
    }

    fn parse(&self, variable: &str) -> Option<Variable> {
        if variable.is_empty() {
            error!("NoneError: Redis Variable not provided");
            return None;
        }
        match Variable::parse(variable) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                error!(variable, error = %e, "invalid variable");
                None
            }
        }
    }

    /// Check that a variable holds a non-empty value
    ///
    /// # Errors
    /// Returns error if the store read fails.
    pub fn not_null(&self, variable: &str) -> ValidateResult<bool> {
        let Some(parsed) = self.parse(variable) else {
            return Ok(false);
        };
        let value = self.client.read(&parsed)?;
        info!(target: "validate", variable, db_data = ?value, "not null");
        match value {
            Some(v) if !v.is_empty() => Ok(true),
            _ => {
                error!("NotFoundError: Redis Variable {variable} was not found.");
                Ok(false)
            }
        }
    }

    /// Check that the stored value has the shape of the variable type
    ///
    /// Shapes are checked strictly: a scalar stored under an array type
    /// does not match.
    ///
    /// # Errors
    /// Returns error if the store read fails.
    pub fn type_matches(&self, variable: &str) -> ValidateResult<bool> {
        let Some(parsed) = self.parse(variable) else {
            return Ok(false);
        };
        let key = parsed.to_string();
        let stored = self
            .client
            .store()
            .hget(self.client.context(), &key)
            .map_err(PlaybookError::from)?;
        let raw = match stored {
            Some(bytes) => decode(&parsed, bytes).ok(),
            None => None,
        };
        let Some(raw) = raw.filter(|r| !is_unset(r)) else {
            error!("NotFoundError: Redis Variable {variable} was not found.");
            return Ok(false);
        };
        let found = raw.kind_name();
        match coerce_as(parsed.kind(), raw) {
            Ok(_) if shape_matches(&parsed, found) => Ok(true),
            _ => {
                error!(
                    "TypeMismatchError: Redis Type: {} and Variable: {variable} do not match",
                    found
                );
                Ok(false)
            }
        }
    }

    /// Assert `app_data <op> expected` for a stored variable
    ///
    /// The operator defaults to `eq`. Unknown operators are logged and
    /// fail.
    ///
    /// # Errors
    /// Returns error if the store read fails.
    pub fn data(
        &self,
        variable: &str,
        expected: &Value,
        op: Option<&str>,
        options: &CompareOptions,
    ) -> ValidateResult<ValidationOutcome> {
        let op = op.unwrap_or("eq");
        let Some(parsed) = self.parse(variable) else {
            return Ok(ValidationOutcome::fail("NoneError: Redis Variable not provided"));
        };
        if let Err(e) = self.engine.operator(op) {
            error!("{e}");
            return Ok(ValidationOutcome::fail(e.to_string()));
        }

        let app = self
            .client
            .read(&parsed)?
            .map_or(Value::Null, |v| v.to_json());

        info!("{0} {variable} {0}", "-".repeat(10));
        let result = self.engine.compare(op, &app, expected, options);
        self.log_block(result.passed, &app, expected, op, result.details.trim());

        Ok(ValidationOutcome {
            passed: result.passed,
            assert_error: format!(
                "\n App Data     : {app}\n Expected Data: {expected}\n Details      : {}\n",
                result.details
            ),
        })
    }

    fn log_block(&self, passed: bool, app: &Value, expected: &Value, op: &str, details: &str) {
        let (app_shown, test_shown) = if passed {
            (
                truncate_for_log(app, self.truncate),
                truncate_for_log(expected, self.truncate),
            )
        } else {
            (app.clone(), expected.clone())
        };
        info!(target: "validate", "App Data : ({app_shown}), Type: [{}]", kind_of(app));
        info!(target: "validate", "Operator : {op}");
        info!(target: "validate", "Test Data: ({test_shown}), Type: [{}]", kind_of(expected));
        if passed {
            info!(target: "validate", "Result   : Passed");
        } else {
            info!(target: "validate", "Result   : Failed");
            info!(target: "validate", "Details  : {details}");
        }
    }
}

/// Null or an empty sequence
fn is_unset(raw: &RawValue) -> bool {
    match raw {
        RawValue::Json(Value::Null) => true,
        RawValue::Json(Value::Array(items)) => items.is_empty(),
        RawValue::BytesArray(items) => items.is_empty(),
        _ => false,
    }
}

fn shape_matches(variable: &Variable, found: &str) -> bool {
    variable.kind() == VariableType::Raw
        || variable.kind().is_array() == matches!(found, "array" | "bytes array")
}
