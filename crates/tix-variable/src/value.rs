//! Typed playbook values
//!
//! [`TypedValue`] is the strict, validated payload bound to a variable's
//! declared type. Loose input enters as a [`RawValue`] and only crosses into
//! `TypedValue` through [`crate::coerce`].

use crate::variable_type::VariableType;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Strict payload of a variable
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// UTF-8 text
    String(String),
    /// Opaque bytes
    Binary(Vec<u8>),
    /// Key/value pair
    KeyValue(Box<KeyValue>),
    /// Platform object reference
    TcEntity(TcEntity),
    /// Sequence of text
    StringArray(Vec<String>),
    /// Sequence of byte strings
    BinaryArray(Vec<Vec<u8>>),
    /// Sequence of key/value pairs
    KeyValueArray(Vec<KeyValue>),
    /// Sequence of platform object references
    TcEntityArray(Vec<TcEntity>),
    /// Unvalidated passthrough bytes
    Raw(Vec<u8>),
}

impl TypedValue {
    /// Type tag matching this variant
    #[must_use]
    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::String(_) => VariableType::String,
            Self::Binary(_) => VariableType::Binary,
            Self::KeyValue(_) => VariableType::KeyValue,
            Self::TcEntity(_) => VariableType::TcEntity,
            Self::StringArray(_) => VariableType::StringArray,
            Self::BinaryArray(_) => VariableType::BinaryArray,
            Self::KeyValueArray(_) => VariableType::KeyValueArray,
            Self::TcEntityArray(_) => VariableType::TcEntityArray,
            Self::Raw(_) => VariableType::Raw,
        }
    }

    /// Check if this is an array variant
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.variable_type().is_array()
    }

    /// Borrow as text if this is a `String`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of members (1 for scalars)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::StringArray(v) => v.len(),
            Self::BinaryArray(v) => v.len(),
            Self::KeyValueArray(v) => v.len(),
            Self::TcEntityArray(v) => v.len(),
            _ => 1,
        }
    }

    /// Check if this is an array without members
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into scalar members
    ///
    /// Array variants yield one scalar per element; scalars yield themselves.
    #[must_use]
    pub fn into_members(self) -> Vec<TypedValue> {
        match self {
            Self::StringArray(v) => v.into_iter().map(Self::String).collect(),
            Self::BinaryArray(v) => v.into_iter().map(Self::Binary).collect(),
            Self::KeyValueArray(v) => v.into_iter().map(|kv| Self::KeyValue(Box::new(kv))).collect(),
            Self::TcEntityArray(v) => v.into_iter().map(Self::TcEntity).collect(),
            scalar => vec![scalar],
        }
    }

    /// Concatenate two values of the same array type
    ///
    /// A scalar `other` of the matching base type is appended as one member.
    /// Returns `Err(other)` when the shapes do not line up.
    pub fn concat(self, other: TypedValue) -> Result<TypedValue, TypedValue> {
        match (self, other) {
            (Self::StringArray(mut a), Self::StringArray(b)) => {
                a.extend(b);
                Ok(Self::StringArray(a))
            }
            (Self::StringArray(mut a), Self::String(b)) => {
                a.push(b);
                Ok(Self::StringArray(a))
            }
            (Self::BinaryArray(mut a), Self::BinaryArray(b)) => {
                a.extend(b);
                Ok(Self::BinaryArray(a))
            }
            (Self::BinaryArray(mut a), Self::Binary(b)) => {
                a.push(b);
                Ok(Self::BinaryArray(a))
            }
            (Self::KeyValueArray(mut a), Self::KeyValueArray(b)) => {
                a.extend(b);
                Ok(Self::KeyValueArray(a))
            }
            (Self::KeyValueArray(mut a), Self::KeyValue(b)) => {
                a.push(*b);
                Ok(Self::KeyValueArray(a))
            }
            (Self::TcEntityArray(mut a), Self::TcEntityArray(b)) => {
                a.extend(b);
                Ok(Self::TcEntityArray(a))
            }
            (Self::TcEntityArray(mut a), Self::TcEntity(b)) => {
                a.push(b);
                Ok(Self::TcEntityArray(a))
            }
            (_, other) => Err(other),
        }
    }

    /// JSON view of this value
    ///
    /// Bytes render as base64 text (raw bytes that are valid UTF-8 render
    /// as text).
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Convert back into loose input, losslessly
    #[must_use]
    pub fn to_raw(&self) -> RawValue {
        match self {
            Self::Binary(b) | Self::Raw(b) => RawValue::Bytes(b.clone()),
            Self::BinaryArray(v) => RawValue::BytesArray(v.clone()),
            other => RawValue::Json(other.to_json()),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Binary(b) => serializer.serialize_str(&BASE64.encode(b)),
            Self::KeyValue(kv) => kv.serialize(serializer),
            Self::TcEntity(e) => e.serialize(serializer),
            Self::StringArray(v) => v.serialize(serializer),
            Self::BinaryArray(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for b in v {
                    seq.serialize_element(&BASE64.encode(b))?;
                }
                seq.end()
            }
            Self::KeyValueArray(v) => v.serialize(serializer),
            Self::TcEntityArray(v) => v.serialize(serializer),
            Self::Raw(b) => match std::str::from_utf8(b) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => serializer.serialize_str(&BASE64.encode(b)),
            },
        }
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<KeyValue> for TypedValue {
    fn from(value: KeyValue) -> Self {
        Self::KeyValue(Box::new(value))
    }
}

impl From<TcEntity> for TypedValue {
    fn from(value: TcEntity) -> Self {
        Self::TcEntity(value)
    }
}

/// The atomic structured unit: `{key, value, variableType?}`
///
/// `value` is `None` when the input carried `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    /// Key
    pub key: String,
    /// Nested value
    pub value: Option<TypedValue>,
    /// Declared type of the nested value, if the producer tagged it
    #[serde(rename = "variableType", skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
}

impl KeyValue {
    /// Create pair with a value
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            variable_type: None,
        }
    }

    /// Create pair whose value is `null`
    #[inline]
    #[must_use]
    pub fn null(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            variable_type: None,
        }
    }

    /// Tag the nested value with a declared type
    #[inline]
    #[must_use]
    pub fn with_variable_type(mut self, variable_type: impl Into<String>) -> Self {
        self.variable_type = Some(variable_type.into());
        self
    }
}

/// Reference to a platform object
///
/// Fields beyond `id`, `type` and `value` are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcEntity {
    /// Platform id
    pub id: String,
    /// Object type (e.g. `Address`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Summary value
    pub value: String,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TcEntity {
    /// Create entity reference without extra fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// Loosely-typed input awaiting coercion
///
/// JSON cannot carry bytes, so byte payloads have their own variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Any JSON-compatible value
    Json(Value),
    /// A single byte string
    Bytes(Vec<u8>),
    /// A sequence of byte strings
    BytesArray(Vec<Vec<u8>>),
}

impl RawValue {
    /// The JSON `null`
    pub const NULL: RawValue = RawValue::Json(Value::Null);

    /// Check if this is JSON `null`
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    /// Check if this is a sequence
    #[inline]
    #[must_use]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Json(Value::Array(_)) | Self::BytesArray(_))
    }

    /// Short name of the input kind, for error messages
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Json(v) => json_kind(v),
            Self::Bytes(_) => "bytes",
            Self::BytesArray(_) => "bytes array",
        }
    }
}

/// Short name of a JSON value's kind
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for RawValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<Vec<u8>>> for RawValue {
    fn from(value: Vec<Vec<u8>>) -> Self {
        Self::BytesArray(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_value_serializes_wire_fields() {
        let kv = KeyValue::new("one", "1").with_variable_type("String");
        assert_eq!(
            serde_json::to_value(&kv).unwrap(),
            json!({"key": "one", "value": "1", "variableType": "String"})
        );
        let null = KeyValue::null("k");
        assert_eq!(serde_json::to_value(&null).unwrap(), json!({"key": "k", "value": null}));
    }

    #[test]
    fn entity_keeps_extra_fields() {
        let raw = json!({"id": "1", "type": "Address", "value": "1.1.1.1", "rating": 3});
        let entity: TcEntity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entity.extra.get("rating"), Some(&json!(3)));
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);
    }

    #[test]
    fn into_members_splits_arrays() {
        let arr = TypedValue::StringArray(vec!["a".into(), "b".into()]);
        assert_eq!(
            arr.into_members(),
            vec![TypedValue::from("a"), TypedValue::from("b")]
        );
        assert_eq!(TypedValue::from("x").into_members(), vec![TypedValue::from("x")]);
    }

    #[test]
    fn concat_arrays_and_members() {
        let a = TypedValue::StringArray(vec!["a".into(), "b".into()]);
        let merged = a.concat(TypedValue::StringArray(vec!["c".into()])).unwrap();
        assert_eq!(merged, TypedValue::StringArray(vec!["a".into(), "b".into(), "c".into()]));

        let kva = TypedValue::KeyValueArray(vec![KeyValue::new("one", "1")]);
        let merged = kva.concat(KeyValue::new("two", "2").into()).unwrap();
        assert_eq!(merged.len(), 2);

        let mismatch = TypedValue::StringArray(vec![]).concat(TypedValue::Binary(vec![1]));
        assert!(mismatch.is_err());
    }

    #[test]
    fn binary_renders_as_base64() {
        let value = TypedValue::BinaryArray(vec![b"not".to_vec(), b"binary".to_vec()]);
        assert_eq!(value.to_json(), json!(["bm90", "YmluYXJ5"]));
        assert_eq!(TypedValue::Raw(b"raw data".to_vec()).to_json(), json!("raw data"));
    }

    #[test]
    fn to_raw_keeps_bytes() {
        let value = TypedValue::Binary(b"bytes".to_vec());
        assert_eq!(value.to_raw(), RawValue::Bytes(b"bytes".to_vec()));
        let value = TypedValue::from("s");
        assert_eq!(value.to_raw(), RawValue::Json(json!("s")));
    }
}
