//! Playbook key-value client
//!
//! Provides [`KvStoreClient`], which reads and writes typed variables in the
//! hash named by the execution context.
//!
//! # Store wire encoding
//!
//! - `Binary` and `Raw`: the bytes themselves
//! - `BinaryArray`: JSON array of base64 members
//! - everything else: JSON

use crate::error::{PlaybookError, PlaybookResult};
use crate::store::KvStore;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tix_variable::{
    coerce, FieldSpec, RawValue, TypedValue, Variable, VariableType, SELECT_SENTINEL,
    VARIABLE_INPUT_SENTINEL,
};

/// Typed access to playbook variables of one execution context
#[derive(Debug)]
pub struct KvStoreClient<S> {
    store: S,
    context: String,
}

impl<S: KvStore> KvStoreClient<S> {
    /// Create client for an execution context
    #[inline]
    #[must_use]
    pub fn new(store: S, context: impl Into<String>) -> Self {
        Self {
            store,
            context: context.into(),
        }
    }

    /// Execution context (hash key in the store)
    #[inline]
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a variable
    ///
    /// Returns `None` when the key is absent or holds JSON `null`.
    ///
    /// # Errors
    /// Returns error if the store fails or the stored bytes do not fit the
    /// variable type.
    pub fn read(&self, variable: &Variable) -> PlaybookResult<Option<TypedValue>> {
        let key = variable.to_string();
        let Some(bytes) = self.store.hget(&self.context, &key)? else {
            tracing::debug!(variable = %key, "variable not found");
            return Ok(None);
        };

        let raw = decode(variable, bytes)?;
        let value = coerce(&FieldSpec::lenient(variable.kind()), raw)
            .map_err(|e| PlaybookError::coercion(variable, e))?;
        tracing::debug!(variable = %key, found = value.is_some(), "read variable");
        Ok(value)
    }

    /// Parse a raw variable string and read it
    ///
    /// # Errors
    /// Returns [`PlaybookError::Address`] for a malformed string, otherwise
    /// as [`Self::read`].
    pub fn read_str(&self, raw: &str) -> PlaybookResult<Option<TypedValue>> {
        let variable = Variable::parse(raw)?;
        self.read(&variable)
    }

    /// Read a variable as a sequence of scalar members
    ///
    /// A scalar is returned as one member; absent values give no members.
    ///
    /// # Errors
    /// Same as [`Self::read`].
    pub fn read_array(&self, variable: &Variable) -> PlaybookResult<Vec<TypedValue>> {
        Ok(self
            .read(variable)?
            .map(TypedValue::into_members)
            .unwrap_or_default())
    }

    /// Read several variables in order
    ///
    /// # Errors
    /// Stops at the first failing read.
    pub fn read_many<'v>(
        &self,
        variables: impl IntoIterator<Item = &'v Variable>,
    ) -> PlaybookResult<Vec<Option<TypedValue>>> {
        variables.into_iter().map(|v| self.read(v)).collect()
    }

    /// Resolve variables inside a string
    ///
    /// A string that is exactly one variable yields that variable's value.
    /// Otherwise every embedded variable is replaced by its value: text as
    /// is, other values as compact JSON, absent values as nothing.
    ///
    /// # Errors
    /// Returns error if any embedded read fails.
    pub fn read_embedded(&self, text: &str) -> PlaybookResult<Option<TypedValue>> {
        if let Ok(variable) = Variable::parse(text) {
            return self.read(&variable);
        }

        let found = Variable::find_embedded(text);
        if found.is_empty() {
            return Ok(Some(TypedValue::String(text.to_string())));
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (range, variable) in found {
            out.push_str(&text[cursor..range.start]);
            match self.read(&variable)? {
                Some(TypedValue::String(s)) => out.push_str(&s),
                Some(other) => out.push_str(&other.to_json().to_string()),
                None => {}
            }
            cursor = range.end;
        }
        out.push_str(&text[cursor..]);
        Ok(Some(TypedValue::String(out)))
    }

    /// Write a variable, replacing any previous value
    ///
    /// # Errors
    /// Returns [`PlaybookError::TypeMismatch`] if the value variant does not
    /// match the variable type, or a store error.
    pub fn write(&self, variable: &Variable, value: &TypedValue) -> PlaybookResult<()> {
        if value.variable_type() != variable.kind() {
            return Err(PlaybookError::TypeMismatch {
                variable: variable.to_string(),
                expected: variable.kind(),
                found: value.variable_type(),
            });
        }

        let key = variable.to_string();
        let bytes = encode(value)?;
        self.store.hset(&self.context, &key, &bytes)?;
        tracing::debug!(variable = %key, bytes = bytes.len(), "wrote variable");
        Ok(())
    }

    /// Coerce loose input against the variable type and write it
    ///
    /// Returns `false` without writing when the input is `null`.
    ///
    /// # Errors
    /// Returns error if coercion or the store fails.
    pub fn write_raw(&self, variable: &Variable, raw: RawValue) -> PlaybookResult<bool> {
        match coerce(&FieldSpec::lenient(variable.kind()), raw)
            .map_err(|e| PlaybookError::coercion(variable, e))?
        {
            Some(value) => self.write(variable, &value).map(|()| true),
            None => Ok(false),
        }
    }

    /// Delete a variable; returns whether it existed
    ///
    /// # Errors
    /// Returns error if the store fails.
    pub fn delete(&self, variable: &Variable) -> PlaybookResult<bool> {
        let key = variable.to_string();
        let existed = self.store.hdel(&self.context, &key)?;
        tracing::debug!(variable = %key, existed, "deleted variable");
        Ok(existed)
    }

    /// Declared type of a raw variable string
    ///
    /// # Errors
    /// Returns [`PlaybookError::Address`] for a malformed string.
    pub fn variable_type(&self, raw: &str) -> PlaybookResult<VariableType> {
        Ok(Variable::parse(raw)?.kind())
    }

    /// Resolve a choice input
    ///
    /// `-- Select --` yields nothing, `-- Variable Input --` resolves `alt`,
    /// anything else is resolved itself. Resolution reads variables and
    /// passes literals through.
    ///
    /// # Errors
    /// Returns error if a read fails.
    pub fn read_choice(&self, primary: &str, alt: Option<&str>) -> PlaybookResult<Option<TypedValue>> {
        match primary {
            SELECT_SENTINEL => Ok(None),
            VARIABLE_INPUT_SENTINEL => match alt {
                Some(alt) => self.read_embedded(alt),
                None => Ok(None),
            },
            other => self.read_embedded(other),
        }
    }
}

/// Encode a value for the store wire
///
/// # Errors
/// Returns error if JSON encoding fails.
pub fn encode(value: &TypedValue) -> PlaybookResult<Vec<u8>> {
    match value {
        TypedValue::Binary(b) | TypedValue::Raw(b) => Ok(b.clone()),
        other => Ok(serde_json::to_vec(other)?),
    }
}

/// Decode store bytes into loose input for a variable's type
///
/// # Errors
/// Returns [`PlaybookError::Decode`] if the bytes are not valid for the
/// type's wire encoding.
pub fn decode(variable: &Variable, bytes: Vec<u8>) -> PlaybookResult<RawValue> {
    match variable.kind() {
        VariableType::Binary | VariableType::Raw => Ok(RawValue::Bytes(bytes)),
        VariableType::BinaryArray => {
            let value: Value =
                serde_json::from_slice(&bytes).map_err(|e| PlaybookError::decode(variable, e))?;
            match value {
                Value::Null => Ok(RawValue::NULL),
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::String(s) => BASE64
                            .decode(s)
                            .map_err(|e| PlaybookError::decode(variable, format!("member {i}: {e}"))),
                        other => Err(PlaybookError::decode(
                            variable,
                            format!("member {i} is not base64 text: {other}"),
                        )),
                    })
                    .collect::<PlaybookResult<Vec<_>>>()
                    .map(RawValue::BytesArray),
                other => Err(PlaybookError::decode(
                    variable,
                    format!("expected array of base64 text, found {other}"),
                )),
            }
        }
        _ => serde_json::from_slice::<Value>(&bytes)
            .map(RawValue::Json)
            .map_err(|e| PlaybookError::decode(variable, e)),
    }
}
