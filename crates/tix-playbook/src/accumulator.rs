//! Output accumulator
//!
//! Provides [`OutputAccumulator`], which stages app outputs for one
//! execution context and writes them in a single flush. Only variables in
//! the requested output set are ever written.

use crate::client::KvStoreClient;
use crate::config::PlaybookConfig;
use crate::error::{PlaybookError, PlaybookResult};
use crate::store::KvStore;
use indexmap::IndexMap;
use tix_variable::{
    coerce, FieldSpec, RawValue, TypedValue, Variable, VariableType, SELECT_SENTINEL,
    VARIABLE_INPUT_SENTINEL,
};

/// Staged outputs of one execution context
///
/// Owned by a single flow; concurrent executions use separate instances.
#[derive(Debug)]
pub struct OutputAccumulator<'a, S> {
    client: &'a KvStoreClient<S>,
    requested: Vec<Variable>,
    buffer: IndexMap<(String, VariableType), TypedValue>,
}

impl<'a, S: KvStore> OutputAccumulator<'a, S> {
    /// Create accumulator for a requested output set
    #[must_use]
    pub fn new(client: &'a KvStoreClient<S>, requested: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            client,
            requested: requested.into_iter().collect(),
            buffer: IndexMap::new(),
        }
    }

    /// Create accumulator from the configured output variables
    ///
    /// # Errors
    /// Returns error if a configured output variable is malformed.
    pub fn from_config(client: &'a KvStoreClient<S>, config: &PlaybookConfig) -> PlaybookResult<Self> {
        Ok(Self::new(client, config.output_variables()?))
    }

    /// Requested output variables
    #[inline]
    #[must_use]
    pub fn requested(&self) -> &[Variable] {
        &self.requested
    }

    /// Check if a name (and optionally a type) was requested
    #[must_use]
    pub fn check_output_variable(&self, name: &str, ty: Option<VariableType>) -> bool {
        self.requested
            .iter()
            .any(|v| v.name() == name && ty.map_or(true, |t| v.kind() == t))
    }

    /// Stage a value
    ///
    /// With `append`, array values concatenate onto what is staged; without
    /// it, or for scalar types, the new value replaces. `null` is skipped.
    ///
    /// # Errors
    /// Returns [`PlaybookError::Coercion`] if the value does not fit `ty`.
    pub fn add_output(
        &mut self,
        name: &str,
        value: impl Into<RawValue>,
        ty: VariableType,
        append: bool,
    ) -> PlaybookResult<()> {
        let raw = value.into();
        let Some(value) = coerce(&FieldSpec::lenient(ty), raw)
            .map_err(|e| PlaybookError::coercion(format!("output '{name}'"), e))?
        else {
            tracing::debug!(name, "skipping null output");
            return Ok(());
        };

        tracing::debug!(name, ty = %ty, append, "staged output");
        match self.buffer.get_mut(&(name.to_string(), ty)) {
            Some(staged) if append && ty.is_array() => {
                let previous = std::mem::replace(staged, TypedValue::StringArray(Vec::new()));
                *staged = previous.concat(value).unwrap_or_else(|v| v);
            }
            Some(staged) => *staged = value,
            None => {
                self.buffer.insert((name.to_string(), ty), value);
            }
        }
        Ok(())
    }

    /// Staged value for a name and type
    #[inline]
    #[must_use]
    pub fn staged(&self, name: &str, ty: VariableType) -> Option<&TypedValue> {
        self.buffer.get(&(name.to_string(), ty))
    }

    /// Number of staged outputs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is staged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write one output immediately
    ///
    /// Without `ty`, the type comes from the requested variable of that name
    /// and the name must be unambiguous. A name that is not requested is
    /// discarded silently. Returns the variable written, if any.
    ///
    /// # Errors
    /// Returns error if coercion or the store fails.
    pub fn create_output(
        &self,
        name: &str,
        value: impl Into<RawValue>,
        ty: Option<VariableType>,
    ) -> PlaybookResult<Option<Variable>> {
        let Some(variable) = self.resolve(name, ty) else {
            return Ok(None);
        };
        let written = self.client.write_raw(&variable, value.into())?;
        Ok(written.then_some(variable))
    }

    /// Write every staged output and clear the buffer
    ///
    /// Returns the number of variables written. The buffer is cleared even
    /// when a write fails.
    ///
    /// # Errors
    /// Returns the first write failure.
    pub fn flush(&mut self) -> PlaybookResult<usize> {
        let staged = std::mem::take(&mut self.buffer);
        let mut written = 0;
        for ((name, ty), value) in staged {
            let Some(variable) = self.resolve(&name, Some(ty)) else {
                continue;
            };
            self.client.write(&variable, &value)?;
            written += 1;
        }
        tracing::info!(written, context = self.client.context(), "flushed outputs");
        Ok(written)
    }

    /// Resolve a choice input, preferring staged values
    ///
    /// Same rules as [`KvStoreClient::read_choice`], except a requested
    /// variable that is staged yields the staged value. Namespace and app id
    /// must match the requested variable exactly.
    ///
    /// # Errors
    /// Returns error if a store read fails.
    pub fn read_choice(&self, primary: &str, alt: Option<&str>) -> PlaybookResult<Option<TypedValue>> {
        let target = match primary {
            SELECT_SENTINEL => return Ok(None),
            VARIABLE_INPUT_SENTINEL => match alt {
                Some(alt) => alt,
                None => return Ok(None),
            },
            other => other,
        };

        if let Ok(variable) = Variable::parse(target) {
            if self.requested.contains(&variable) {
                if let Some(value) = self.staged(variable.name(), variable.kind()) {
                    return Ok(Some(value.clone()));
                }
            }
        }
        self.client.read_embedded(target)
    }

    fn resolve(&self, name: &str, ty: Option<VariableType>) -> Option<Variable> {
        let mut matches = self
            .requested
            .iter()
            .filter(|v| v.name() == name && ty.map_or(true, |t| v.kind() == t));
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!(name, "output name matches several requested variables; discarding");
            return None;
        }
        Some(first.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn var(raw: &str) -> Variable {
        Variable::parse(raw).unwrap()
    }

    fn client() -> KvStoreClient<MemoryStore> {
        KvStoreClient::new(MemoryStore::new(), "ctx")
    }

    #[test]
    fn append_concatenates_arrays() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, [var("#App:1:v!StringArray")]);
        out.add_output("v", json!(["a", "b"]), VariableType::StringArray, true).unwrap();
        out.add_output("v", json!(["c"]), VariableType::StringArray, true).unwrap();
        assert_eq!(
            out.staged("v", VariableType::StringArray),
            Some(&TypedValue::StringArray(vec!["a".into(), "b".into(), "c".into()]))
        );
    }

    #[test]
    fn no_append_replaces() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, [var("#App:1:v!StringArray")]);
        out.add_output("v", json!(["a", "b"]), VariableType::StringArray, false).unwrap();
        out.add_output("v", json!(["c"]), VariableType::StringArray, false).unwrap();
        assert_eq!(
            out.staged("v", VariableType::StringArray),
            Some(&TypedValue::StringArray(vec!["c".into()]))
        );
    }

    #[test]
    fn scalars_always_replace() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, Vec::<Variable>::new());
        out.add_output("s", "one", VariableType::String, true).unwrap();
        out.add_output("s", "two", VariableType::String, true).unwrap();
        assert_eq!(out.staged("s", VariableType::String), Some(&TypedValue::from("two")));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn append_wraps_scalar_member() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, Vec::<Variable>::new());
        out.add_output("v", json!(["a"]), VariableType::StringArray, true).unwrap();
        out.add_output("v", "b", VariableType::StringArray, true).unwrap();
        assert_eq!(
            out.staged("v", VariableType::StringArray),
            Some(&TypedValue::StringArray(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn null_is_skipped() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, Vec::<Variable>::new());
        out.add_output("s", RawValue::NULL, VariableType::String, true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_output_is_rejected() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, Vec::<Variable>::new());
        let err = out
            .add_output("kv", json!({"key": "k", "value": "v", "x": 1}), VariableType::KeyValue, true)
            .unwrap_err();
        assert!(matches!(err, PlaybookError::Coercion { .. }));
    }

    #[test]
    fn flush_writes_requested_and_clears() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, [var("#App:1:kept!String")]);
        out.add_output("kept", "yes", VariableType::String, true).unwrap();
        out.add_output("dropped", "no", VariableType::String, true).unwrap();
        assert_eq!(out.flush().unwrap(), 1);
        assert!(out.is_empty());
        assert_eq!(client.read(&var("#App:1:kept!String")).unwrap(), Some("yes".into()));
        assert_eq!(client.read(&var("#App:1:dropped!String")).unwrap(), None);
        assert_eq!(out.flush().unwrap(), 0);
    }

    #[test]
    fn create_output_infers_type_from_requested() {
        let client = client();
        let out = OutputAccumulator::new(&client, [var("#App:1:ips!StringArray")]);
        let written = out.create_output("ips", "1.1.1.1", None).unwrap();
        assert_eq!(written, Some(var("#App:1:ips!StringArray")));
        assert_eq!(
            client.read(&var("#App:1:ips!StringArray")).unwrap(),
            Some(TypedValue::StringArray(vec!["1.1.1.1".into()]))
        );
    }

    #[test]
    fn create_output_discards_ambiguous_name() {
        let client = client();
        let out = OutputAccumulator::new(
            &client,
            [var("#App:1:dup.name!String"), var("#App:1:dup.name!StringArray")],
        );
        assert_eq!(out.create_output("dup.name", "x", None).unwrap(), None);
        assert_eq!(
            out.create_output("dup.name", "x", Some(VariableType::String)).unwrap(),
            Some(var("#App:1:dup.name!String"))
        );
    }

    #[test]
    fn check_output_variable_by_name_and_type() {
        let client = client();
        let out = OutputAccumulator::new(&client, [var("#App:1:s!String")]);
        assert!(out.check_output_variable("s", None));
        assert!(out.check_output_variable("s", Some(VariableType::String)));
        assert!(!out.check_output_variable("s", Some(VariableType::StringArray)));
        assert!(!out.check_output_variable("t", None));
    }

    #[test]
    fn read_choice_prefers_staged() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, [var("#App:1:s!String")]);
        out.add_output("s", "1", VariableType::String, true).unwrap();
        assert_eq!(out.read_choice("#App:1:s!String", None).unwrap(), Some("1".into()));
        assert_eq!(out.read_choice(SELECT_SENTINEL, Some("#App:1:s!String")).unwrap(), None);
    }

    #[test]
    fn read_choice_staged_value_needs_same_app() {
        let client = client();
        let mut out = OutputAccumulator::new(&client, [var("#App:1:s!String")]);
        out.add_output("s", "staged", VariableType::String, true).unwrap();
        client.write(&var("#App:2:s!String"), &"stored".into()).unwrap();
        assert_eq!(out.read_choice("#App:2:s!String", None).unwrap(), Some("stored".into()));
        assert_eq!(out.read_choice("#Other:1:s!String", None).unwrap(), None);
        assert_eq!(out.read_choice("#App:1:s!String", None).unwrap(), Some("staged".into()));
    }
}
