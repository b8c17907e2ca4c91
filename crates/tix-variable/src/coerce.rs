//! Value coercion
//!
//! Provides [`coerce`], the only way loose [`RawValue`] input becomes a
//! [`TypedValue`]. The scalar/array shape rule lives in [`normalize_shape`].
//!
//! # Shape policy
//!
//! - array type, non-sequence input: wrapped into a one-member sequence
//! - scalar type, one-member sequence: unwrapped
//! - scalar type, any other sequence: [`CoercionError::ArrayNotAllowed`]
//! - `Raw` never wraps or unwraps

use crate::registry::{TypeRegistry, Violation};
use crate::value::{RawValue, TypedValue};
use crate::variable_type::VariableType;
use once_cell::sync::Lazy;
use serde_json::Value;

static DEFAULT_REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::with_defaults);

/// Declared type of an input or output field
///
/// `nullable` mirrors an optional wrapper around the type; `allow_empty`
/// mirrors the may-be-empty variant of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Declared type
    pub ty: VariableType,
    /// Accept `null` (yields no value)
    pub nullable: bool,
    /// Accept empty sequences and empty members
    pub allow_empty: bool,
}

impl FieldSpec {
    /// Required, non-empty field
    #[inline]
    #[must_use]
    pub const fn required(ty: VariableType) -> Self {
        Self {
            ty,
            nullable: false,
            allow_empty: false,
        }
    }

    /// Field that tolerates both `null` and empty values
    ///
    /// Used when reading back what is already in the store.
    #[inline]
    #[must_use]
    pub const fn lenient(ty: VariableType) -> Self {
        Self {
            ty,
            nullable: true,
            allow_empty: true,
        }
    }

    /// Accept `null`
    #[inline]
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Accept empty values
    #[inline]
    #[must_use]
    pub const fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }
}

impl From<VariableType> for FieldSpec {
    fn from(ty: VariableType) -> Self {
        Self::required(ty)
    }
}

/// Loose input arranged to match the declared type's arity
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped {
    /// Members of an array type
    Members(Vec<RawValue>),
    /// The single value of a scalar type
    Scalar(RawValue),
}

/// Apply the wrap/unwrap rule for a declared type
///
/// # Errors
/// Returns [`CoercionError::ArrayNotAllowed`] when a scalar type receives a
/// sequence with other than one member.
pub fn normalize_shape(ty: VariableType, raw: RawValue) -> Result<Shaped, CoercionError> {
    if ty == VariableType::Raw {
        return Ok(Shaped::Scalar(raw));
    }

    let mut members: Vec<RawValue> = match raw {
        RawValue::Json(Value::Array(items)) => items.into_iter().map(RawValue::Json).collect(),
        RawValue::BytesArray(items) => items.into_iter().map(RawValue::Bytes).collect(),
        single if ty.is_array() => return Ok(Shaped::Members(vec![single])),
        single => return Ok(Shaped::Scalar(single)),
    };

    if ty.is_array() {
        return Ok(Shaped::Members(members));
    }

    if members.len() == 1 {
        if let Some(only) = members.pop() {
            return Ok(Shaped::Scalar(only));
        }
    }
    Err(CoercionError::ArrayNotAllowed {
        ty,
        len: members.len(),
    })
}

/// Coerce loose input against a field spec with the built-in registry
///
/// Returns `Ok(None)` only for `null` input on a nullable field.
///
/// # Errors
/// Returns the first coercion failure; nothing is partially coerced.
pub fn coerce(spec: &FieldSpec, raw: RawValue) -> Result<Option<TypedValue>, CoercionError> {
    Coercer::new(&DEFAULT_REGISTRY).coerce(spec, raw)
}

/// Coerce loose input into a required value of `ty`
///
/// # Errors
/// Same as [`coerce`]; `null` always fails.
pub fn coerce_as(ty: VariableType, raw: RawValue) -> Result<TypedValue, CoercionError> {
    coerce(&FieldSpec::required(ty), raw)?.ok_or(CoercionError::NullNotAllowed { ty })
}

/// Coercer bound to a specific registry
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> Coercer<'a> {
    /// Create coercer over a registry
    #[inline]
    #[must_use]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Coerce loose input against a field spec
    ///
    /// # Errors
    /// Returns the first coercion failure.
    pub fn coerce(&self, spec: &FieldSpec, raw: RawValue) -> Result<Option<TypedValue>, CoercionError> {
        let ty = spec.ty;
        if raw.is_null() {
            return if spec.nullable {
                Ok(None)
            } else {
                Err(CoercionError::NullNotAllowed { ty })
            };
        }

        match normalize_shape(ty, raw)? {
            Shaped::Scalar(member) => {
                if member.is_null() {
                    return if spec.nullable {
                        Ok(None)
                    } else {
                        Err(CoercionError::NullNotAllowed { ty })
                    };
                }
                let value = self.member(ty, 0, &member)?;
                if !spec.allow_empty && is_empty_member(&value) {
                    return Err(CoercionError::EmptyMemberNotAllowed { ty, index: 0 });
                }
                Ok(Some(value))
            }
            Shaped::Members(members) => {
                if members.is_empty() && !spec.allow_empty {
                    return Err(CoercionError::EmptyArrayNotAllowed { ty });
                }
                let mut values = Vec::with_capacity(members.len());
                for (index, member) in members.iter().enumerate() {
                    values.push(self.member(ty, index, member)?);
                }
                if !spec.allow_empty {
                    if let Some(index) = values.iter().position(is_empty_member) {
                        return Err(CoercionError::EmptyMemberNotAllowed { ty, index });
                    }
                }
                assemble(ty, values).map(Some)
            }
        }
    }

    fn member(&self, ty: VariableType, index: usize, raw: &RawValue) -> Result<TypedValue, CoercionError> {
        if raw.is_null() {
            return Err(CoercionError::InvalidElement {
                ty,
                index,
                reason: Violation::WrongKind {
                    expected: "non-null member",
                    found: "null",
                },
            });
        }
        self.registry
            .parse_member(ty, raw)
            .map_err(|reason| CoercionError::InvalidElement { ty, index, reason })
    }
}

/// Gather parsed scalar members into the array variant of `ty`
fn assemble(ty: VariableType, members: Vec<TypedValue>) -> Result<TypedValue, CoercionError> {
    let mut out = match ty {
        VariableType::StringArray => TypedValue::StringArray(Vec::with_capacity(members.len())),
        VariableType::BinaryArray => TypedValue::BinaryArray(Vec::with_capacity(members.len())),
        VariableType::KeyValueArray => TypedValue::KeyValueArray(Vec::with_capacity(members.len())),
        VariableType::TcEntityArray => TypedValue::TcEntityArray(Vec::with_capacity(members.len())),
        _ => return Err(CoercionError::ArrayNotAllowed { ty, len: members.len() }),
    };
    for (index, member) in members.into_iter().enumerate() {
        out = out.concat(member).map_err(|m| CoercionError::InvalidElement {
            ty,
            index,
            reason: Violation::WrongKind {
                expected: ty.base_type().as_str(),
                found: m.variable_type().as_str(),
            },
        })?;
    }
    Ok(out)
}

/// Check if a scalar member is empty
///
/// Text and bytes are empty when zero-length. A key/value pair is empty when
/// its value is (recursively). An entity is empty when its value is.
#[must_use]
pub fn is_empty_member(value: &TypedValue) -> bool {
    match value {
        TypedValue::String(s) => s.is_empty(),
        TypedValue::Binary(b) | TypedValue::Raw(b) => b.is_empty(),
        TypedValue::KeyValue(kv) => is_empty_nested(kv.value.as_ref()),
        TypedValue::TcEntity(e) => e.value.is_empty(),
        array => is_empty_nested(Some(array)),
    }
}

/// Check if a nested value is empty
///
/// `None` is empty; a sequence is empty when it has no members or all of
/// them are empty.
#[must_use]
pub fn is_empty_nested(value: Option<&TypedValue>) -> bool {
    match value {
        None => true,
        Some(TypedValue::StringArray(v)) => v.iter().all(String::is_empty),
        Some(TypedValue::BinaryArray(v)) => v.iter().all(Vec::is_empty),
        Some(TypedValue::KeyValueArray(v)) => v.iter().all(|kv| is_empty_nested(kv.value.as_ref())),
        Some(TypedValue::TcEntityArray(v)) => v.iter().all(|e| e.value.is_empty()),
        Some(scalar) => is_empty_member(scalar),
    }
}

/// Errors raised while coercing input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// `null` for a non-nullable field
    #[error("null is not allowed for {ty}")]
    NullNotAllowed {
        /// Declared type
        ty: VariableType,
    },

    /// Empty sequence for an array field that must not be empty
    #[error("empty array is not allowed for {ty}")]
    EmptyArrayNotAllowed {
        /// Declared type
        ty: VariableType,
    },

    /// Empty member for a field that must not be empty
    #[error("empty member at index {index} is not allowed for {ty}")]
    EmptyMemberNotAllowed {
        /// Declared type
        ty: VariableType,
        /// Position of the empty member
        index: usize,
    },

    /// Member failed structural validation
    #[error("invalid {ty} element at index {index}: {reason}")]
    InvalidElement {
        /// Declared type
        ty: VariableType,
        /// Position of the invalid member
        index: usize,
        /// Structural rule that failed
        #[source]
        reason: Violation,
    },

    /// Sequence for a scalar field
    #[error("array of {len} members is not allowed for {ty}")]
    ArrayNotAllowed {
        /// Declared scalar type
        ty: VariableType,
        /// Number of members supplied
        len: usize,
    },
}
