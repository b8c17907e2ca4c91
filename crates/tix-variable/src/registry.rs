//! Type registry
//!
//! Provides [`TypeRegistry`], mapping every scalar [`VariableType`] to the
//! structural parser that turns one loose member into a [`TypedValue`].
//! Array types share the parser of their base type.

use crate::value::{json_kind, KeyValue, RawValue, TcEntity, TypedValue};
use crate::variable_type::VariableType;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Structural parser for one scalar member
pub type MemberParser = fn(&RawValue) -> Result<TypedValue, Violation>;

const KEY_VALUE_FIELDS: [&str; 3] = ["key", "value", "variableType"];

/// Registry of supported variable types and their member parsers
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    parsers: IndexMap<VariableType, MemberParser>,
}

impl TypeRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: IndexMap::new(),
        }
    }

    /// Create registry with the built-in scalar kinds
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(VariableType::String, parse_string);
        registry.register(VariableType::Binary, parse_binary);
        registry.register(VariableType::KeyValue, parse_key_value_member);
        registry.register(VariableType::TcEntity, parse_entity_member);
        registry.register(VariableType::Raw, parse_raw);
        registry
    }

    /// Register the parser for a scalar type
    ///
    /// Registering an array type registers its base type.
    pub fn register(&mut self, ty: VariableType, parser: MemberParser) {
        self.parsers.insert(ty.base_type(), parser);
    }

    /// Check if a type (or its base type) is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, ty: VariableType) -> bool {
        self.parsers.contains_key(&ty.base_type())
    }

    /// Resolve a wire tag to a registered type
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Option<VariableType> {
        tag.parse::<VariableType>().ok().filter(|ty| self.contains(*ty))
    }

    /// Wire tags of every registered type, array forms included
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        VariableType::ALL
            .iter()
            .filter(|ty| self.contains(**ty))
            .map(|ty| ty.as_str())
            .collect()
    }

    /// Number of registered scalar kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Check if a type is an `*Array` type
    #[inline]
    #[must_use]
    pub fn is_array_type(&self, ty: VariableType) -> bool {
        ty.is_array()
    }

    /// Strip the `Array` suffix
    #[inline]
    #[must_use]
    pub fn base_type(&self, ty: VariableType) -> VariableType {
        ty.base_type()
    }

    /// Parse one member against the base type of `ty`
    ///
    /// # Errors
    /// Returns the first structural violation found.
    pub fn parse_member(&self, ty: VariableType, raw: &RawValue) -> Result<TypedValue, Violation> {
        let parser = self
            .parsers
            .get(&ty.base_type())
            .ok_or(Violation::Unregistered(ty))?;
        parser(raw)
    }

    /// Structurally validate a loose value against a declared type
    ///
    /// Array types accept a sequence and validate every member, stopping at
    /// the first violation.
    ///
    /// # Errors
    /// Returns the first violation, wrapped in [`Violation::Member`] for
    /// sequence members.
    pub fn validate(&self, ty: VariableType, raw: &RawValue) -> Result<(), Violation> {
        if !ty.is_array() {
            return self.parse_member(ty, raw).map(|_| ());
        }
        let members: Vec<RawValue> = match raw {
            RawValue::Json(Value::Array(items)) => {
                items.iter().cloned().map(RawValue::Json).collect()
            }
            RawValue::BytesArray(items) => items.iter().cloned().map(RawValue::Bytes).collect(),
            other => vec![other.clone()],
        };
        for (index, member) in members.iter().enumerate() {
            self.parse_member(ty, member).map_err(|source| Violation::Member {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }
}

/// Structural reason a member does not fit its type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Required field absent
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// Field outside the recognized set
    #[error("extra field present: '{0}'")]
    ExtraField(String),

    /// Field holds the wrong JSON kind
    #[error("field '{field}' must be {expected}, found {found}")]
    WrongFieldKind {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Member holds the wrong kind
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Nested array mixes member kinds
    #[error("array members are not all of one kind")]
    MixedArray,

    /// Violation inside a nested field
    #[error("in field '{field}': {source}")]
    Nested {
        field: &'static str,
        #[source]
        source: Box<Violation>,
    },

    /// Violation inside a sequence member
    #[error("at index {index}: {source}")]
    Member {
        index: usize,
        #[source]
        source: Box<Violation>,
    },

    /// No parser registered for the type
    #[error("type {0} is not registered")]
    Unregistered(VariableType),
}

impl Violation {
    fn wrong_kind(expected: &'static str, found: &Value) -> Self {
        Self::WrongKind {
            expected,
            found: json_kind(found),
        }
    }
}

fn parse_string(raw: &RawValue) -> Result<TypedValue, Violation> {
    match raw {
        RawValue::Json(Value::String(s)) => Ok(TypedValue::String(s.clone())),
        other => Err(Violation::WrongKind {
            expected: "string",
            found: other.kind_name(),
        }),
    }
}

/// Bytes pass through; text is taken as its UTF-8 bytes
fn parse_binary(raw: &RawValue) -> Result<TypedValue, Violation> {
    match raw {
        RawValue::Bytes(b) => Ok(TypedValue::Binary(b.clone())),
        RawValue::Json(Value::String(s)) => Ok(TypedValue::Binary(s.as_bytes().to_vec())),
        other => Err(Violation::WrongKind {
            expected: "bytes",
            found: other.kind_name(),
        }),
    }
}

fn parse_key_value_member(raw: &RawValue) -> Result<TypedValue, Violation> {
    match raw {
        RawValue::Json(Value::Object(map)) => parse_key_value(map).map(TypedValue::from),
        other => Err(Violation::WrongKind {
            expected: "object",
            found: other.kind_name(),
        }),
    }
}

fn parse_entity_member(raw: &RawValue) -> Result<TypedValue, Violation> {
    match raw {
        RawValue::Json(Value::Object(map)) => parse_entity(map).map(TypedValue::TcEntity),
        other => Err(Violation::WrongKind {
            expected: "object",
            found: other.kind_name(),
        }),
    }
}

/// Anything goes; non-text JSON is kept in its serialized form
fn parse_raw(raw: &RawValue) -> Result<TypedValue, Violation> {
    let bytes = match raw {
        RawValue::Bytes(b) => b.clone(),
        RawValue::Json(Value::String(s)) => s.as_bytes().to_vec(),
        RawValue::Json(other) => other.to_string().into_bytes(),
        RawValue::BytesArray(items) => TypedValue::BinaryArray(items.clone())
            .to_json()
            .to_string()
            .into_bytes(),
    };
    Ok(TypedValue::Raw(bytes))
}

/// Parse a `{key, value, variableType?}` object
///
/// Unknown fields are rejected rather than dropped.
///
/// # Errors
/// Returns the first violation found, including ones nested in `value`.
pub fn parse_key_value(map: &Map<String, Value>) -> Result<KeyValue, Violation> {
    if let Some(extra) = map.keys().find(|k| !KEY_VALUE_FIELDS.contains(&k.as_str())) {
        return Err(Violation::ExtraField(extra.clone()));
    }

    let key = match map.get("key") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(Violation::WrongFieldKind {
                field: "key",
                expected: "string",
                found: json_kind(other),
            })
        }
        None => return Err(Violation::MissingField("key")),
    };

    let value = map.get("value").ok_or(Violation::MissingField("value"))?;
    let value = parse_nested(value).map_err(|source| Violation::Nested {
        field: "value",
        source: Box::new(source),
    })?;

    let variable_type = match map.get("variableType") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(Violation::WrongFieldKind {
                field: "variableType",
                expected: "string",
                found: json_kind(other),
            })
        }
    };

    Ok(KeyValue {
        key,
        value,
        variable_type,
    })
}

/// Parse a `{id, type, value, ...}` object
///
/// # Errors
/// Returns a violation if `id`, `type` or `value` is absent or not text.
pub fn parse_entity(map: &Map<String, Value>) -> Result<TcEntity, Violation> {
    let field = |name: &'static str| match map.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Violation::WrongFieldKind {
            field: name,
            expected: "string",
            found: json_kind(other),
        }),
        None => Err(Violation::MissingField(name)),
    };

    let id = field("id")?;
    let kind = field("type")?;
    let value = field("value")?;
    let extra = map
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "id" | "type" | "value"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(TcEntity {
        id,
        kind,
        value,
        extra,
    })
}

/// An object carrying `type` but no `key` is an entity reference
fn looks_like_entity(map: &Map<String, Value>) -> bool {
    map.contains_key("type") && !map.contains_key("key")
}

/// Parse the `value` of a key/value pair
///
/// The nested kind is inferred from the JSON shape. `[]` reads as an empty
/// `StringArray`.
fn parse_nested(value: &Value) -> Result<Option<TypedValue>, Violation> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(TypedValue::String(s.clone()))),
        Value::Object(map) if looks_like_entity(map) => parse_entity(map).map(|e| Some(e.into())),
        Value::Object(map) => parse_key_value(map).map(|kv| Some(kv.into())),
        Value::Array(items) => parse_nested_array(items).map(Some),
        other => Err(Violation::wrong_kind("string, object or array", other)),
    }
}

fn parse_nested_array(items: &[Value]) -> Result<TypedValue, Violation> {
    let Some(first) = items.first() else {
        return Ok(TypedValue::StringArray(Vec::new()));
    };

    let member = |index: usize, source: Violation| Violation::Member {
        index,
        source: Box::new(source),
    };

    match first {
        Value::String(_) => items
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Null => Err(member(i, Violation::wrong_kind("string", v))),
                _ => Err(Violation::MixedArray),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TypedValue::StringArray),
        Value::Object(map) if looks_like_entity(map) => items
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(m) if looks_like_entity(m) => {
                    parse_entity(m).map_err(|e| member(i, e))
                }
                Value::Null => Err(member(i, Violation::wrong_kind("object", v))),
                _ => Err(Violation::MixedArray),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TypedValue::TcEntityArray),
        Value::Object(_) => items
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(m) if !looks_like_entity(m) => {
                    parse_key_value(m).map_err(|e| member(i, e))
                }
                Value::Null => Err(member(i, Violation::wrong_kind("object", v))),
                _ => Err(Violation::MixedArray),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TypedValue::KeyValueArray),
        other => Err(member(0, Violation::wrong_kind("string or object", other))),
    }
}
