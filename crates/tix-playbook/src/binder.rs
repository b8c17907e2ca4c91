//! Input binding
//!
//! Provides [`InputBinder`], which turns an app's raw JSON arguments into
//! typed inputs. Variable references are read from the store before
//! coercion; any failure aborts the whole bind.

use crate::client::KvStoreClient;
use crate::error::{BindError, PlaybookError};
use crate::store::KvStore;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tix_variable::{coerce, FieldSpec, RawValue, TypedValue, Variable, VariableType};

/// Declared input fields, in binding order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl InputSchema {
    /// Create new empty schema
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.insert(name.into(), spec.into());
        self
    }

    /// Spec of a declared field
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Iterate over declared fields
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no fields are declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Successfully bound inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundInputs {
    values: IndexMap<String, Option<TypedValue>>,
}

impl BoundInputs {
    /// Bound value of a field (`None` if null or undeclared)
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Bound text of a `String` field
    #[inline]
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(TypedValue::as_str)
    }

    /// Check if a field is bound to a value
    #[inline]
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over every declared field
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&TypedValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Number of declared fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing was declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unwrap into the underlying map
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, Option<TypedValue>> {
        self.values
    }
}

/// Binds raw arguments against an [`InputSchema`]
#[derive(Debug, Clone, Copy)]
pub struct InputBinder<'a, S> {
    client: &'a KvStoreClient<S>,
}

impl<'a, S: KvStore> InputBinder<'a, S> {
    /// Create binder reading variables through `client`
    #[inline]
    #[must_use]
    pub fn new(client: &'a KvStoreClient<S>) -> Self {
        Self { client }
    }

    /// Bind every declared field
    ///
    /// Per field: `""` becomes `null`, strings holding variables are resolved
    /// through the store, then the result is coerced against the field spec.
    /// Arguments without a declared field are ignored.
    ///
    /// # Errors
    /// Returns [`BindError::Field`] for the first field that fails.
    pub fn bind(&self, schema: &InputSchema, inputs: &Map<String, Value>) -> Result<BoundInputs, BindError> {
        let mut values = IndexMap::with_capacity(schema.len());
        for (name, spec) in schema.iter() {
            let fail = |source: PlaybookError| BindError::Field {
                field: name.to_string(),
                source,
            };
            let raw = self.resolve(inputs.get(name), spec.ty).map_err(fail)?;
            let value = coerce(spec, raw)
                .map_err(|e| fail(PlaybookError::coercion(format!("input '{name}'"), e)))?;
            values.insert(name.to_string(), value);
        }
        tracing::debug!(fields = values.len(), "bound inputs");
        Ok(BoundInputs { values })
    }

    fn resolve(&self, input: Option<&Value>, ty: VariableType) -> Result<RawValue, PlaybookError> {
        match input {
            None | Some(Value::Null) => Ok(RawValue::NULL),
            Some(Value::String(s)) if s.is_empty() => Ok(RawValue::NULL),
            Some(Value::String(s)) if is_reference(s, ty) => {
                let resolved = self.client.read_embedded(s)?;
                Ok(match resolved {
                    Some(TypedValue::String(text)) if ty.is_binary() => RawValue::Bytes(text.into_bytes()),
                    Some(value) => value.to_raw(),
                    None => RawValue::NULL,
                })
            }
            Some(other) => Ok(RawValue::Json(other.clone())),
        }
    }
}

/// Whole-variable strings resolve for any type; embedded substitution
/// applies to String fields only.
fn is_reference(text: &str, ty: VariableType) -> bool {
    Variable::is_variable(text) || (ty == VariableType::String && text.contains('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tix_variable::CoercionError;

    fn client() -> KvStoreClient<MemoryStore> {
        let client = KvStoreClient::new(MemoryStore::new(), "ctx");
        client
            .write(&Variable::parse("#App:1:ip!String").unwrap(), &"1.1.1.1".into())
            .unwrap();
        client
    }

    fn inputs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn binds_literals_and_variables() {
        let client = client();
        let schema = InputSchema::new()
            .field("indicator", VariableType::String)
            .field("tags", VariableType::StringArray)
            .field("note", FieldSpec::required(VariableType::String).nullable());
        let bound = InputBinder::new(&client)
            .bind(&schema, &inputs(json!({"indicator": "#App:1:ip!String", "tags": "one", "other": 1})))
            .unwrap();
        assert_eq!(bound.get_str("indicator"), Some("1.1.1.1"));
        assert_eq!(bound.get("tags"), Some(&TypedValue::StringArray(vec!["one".into()])));
        assert!(!bound.is_present("note"));
        assert_eq!(bound.len(), 3);
    }

    #[test]
    fn embedded_variables_are_substituted() {
        let client = client();
        let schema = InputSchema::new().field("message", VariableType::String);
        let bound = InputBinder::new(&client)
            .bind(&schema, &inputs(json!({"message": "saw #App:1:ip!String"})))
            .unwrap();
        assert_eq!(bound.get_str("message"), Some("saw 1.1.1.1"));
    }

    #[test]
    fn hash_in_non_string_field_is_literal() {
        let client = client();
        let schema = InputSchema::new()
            .field("tags", VariableType::StringArray)
            .field("ips", VariableType::StringArray);
        let bound = InputBinder::new(&client)
            .bind(
                &schema,
                &inputs(json!({"tags": "issue #App:1:ip!String", "ips": "#App:1:ip!String"})),
            )
            .unwrap();
        assert_eq!(
            bound.get("tags"),
            Some(&TypedValue::StringArray(vec!["issue #App:1:ip!String".into()]))
        );
        assert_eq!(bound.get("ips"), Some(&TypedValue::StringArray(vec!["1.1.1.1".into()])));
    }

    #[test]
    fn empty_string_is_null() {
        let client = client();
        let schema = InputSchema::new().field("indicator", VariableType::String);
        let err = InputBinder::new(&client)
            .bind(&schema, &inputs(json!({"indicator": ""})))
            .unwrap_err();
        assert_eq!(err.field(), "indicator");
        let BindError::Field {
            source: PlaybookError::Coercion { source, .. },
            ..
        } = err
        else {
            panic!("expected coercion failure");
        };
        assert_eq!(source, CoercionError::NullNotAllowed { ty: VariableType::String });
    }

    #[test]
    fn first_failure_aborts_bind() {
        let client = client();
        let schema = InputSchema::new()
            .field("good", VariableType::String)
            .field("bad", VariableType::KeyValue)
            .field("later", VariableType::String);
        let err = InputBinder::new(&client)
            .bind(
                &schema,
                &inputs(json!({"good": "x", "bad": {"key": "k", "value": "v", "extra": 1}})),
            )
            .unwrap_err();
        assert_eq!(err.field(), "bad");
    }

    #[test]
    fn missing_variable_reads_as_null() {
        let client = client();
        let schema = InputSchema::new().field("optional", FieldSpec::required(VariableType::String).nullable());
        let bound = InputBinder::new(&client)
            .bind(&schema, &inputs(json!({"optional": "#App:1:absent!String"})))
            .unwrap();
        assert_eq!(bound.get("optional"), None);
    }
}
