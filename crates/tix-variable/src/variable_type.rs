//! Variable type tags
//!
//! Provides [`VariableType`], the closed set of type suffixes a playbook
//! variable may carry after its `!` separator.

use crate::address::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Type tag carried in a variable's `!<Type>` suffix
///
/// Every scalar kind except [`VariableType::Raw`] has an `*Array`
/// counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// UTF-8 text
    String,
    /// Sequence of UTF-8 text
    StringArray,
    /// Opaque bytes
    Binary,
    /// Sequence of opaque bytes
    BinaryArray,
    /// `{key, value, variableType?}` pair
    KeyValue,
    /// Sequence of key/value pairs
    KeyValueArray,
    /// Reference to a platform object
    #[serde(rename = "TCEntity")]
    TcEntity,
    /// Sequence of platform object references
    #[serde(rename = "TCEntityArray")]
    TcEntityArray,
    /// Unvalidated passthrough
    Raw,
}

impl VariableType {
    /// Every registered type, scalars before their array forms
    pub const ALL: [VariableType; 9] = [
        VariableType::String,
        VariableType::StringArray,
        VariableType::Binary,
        VariableType::BinaryArray,
        VariableType::KeyValue,
        VariableType::KeyValueArray,
        VariableType::TcEntity,
        VariableType::TcEntityArray,
        VariableType::Raw,
    ];

    /// Wire tag of this type
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::StringArray => "StringArray",
            Self::Binary => "Binary",
            Self::BinaryArray => "BinaryArray",
            Self::KeyValue => "KeyValue",
            Self::KeyValueArray => "KeyValueArray",
            Self::TcEntity => "TCEntity",
            Self::TcEntityArray => "TCEntityArray",
            Self::Raw => "Raw",
        }
    }

    /// Check if this is an `*Array` type
    #[inline]
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::StringArray | Self::BinaryArray | Self::KeyValueArray | Self::TcEntityArray
        )
    }

    /// Strip the `Array` suffix (scalars map to themselves)
    #[inline]
    #[must_use]
    pub const fn base_type(self) -> Self {
        match self {
            Self::StringArray => Self::String,
            Self::BinaryArray => Self::Binary,
            Self::KeyValueArray => Self::KeyValue,
            Self::TcEntityArray => Self::TcEntity,
            other => other,
        }
    }

    /// Array counterpart of a scalar type
    ///
    /// `Raw` has none; array types return themselves.
    #[inline]
    #[must_use]
    pub const fn array_type(self) -> Option<Self> {
        match self {
            Self::String | Self::StringArray => Some(Self::StringArray),
            Self::Binary | Self::BinaryArray => Some(Self::BinaryArray),
            Self::KeyValue | Self::KeyValueArray => Some(Self::KeyValueArray),
            Self::TcEntity | Self::TcEntityArray => Some(Self::TcEntityArray),
            Self::Raw => None,
        }
    }

    /// Check if values of this type bypass JSON on the store wire
    #[inline]
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary | Self::BinaryArray)
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AddressError::UnknownType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for ty in VariableType::ALL {
            assert_eq!(ty.as_str().parse::<VariableType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "None".parse::<VariableType>().unwrap_err();
        assert!(matches!(err, AddressError::UnknownType(tag) if tag == "None"));
    }

    #[test]
    fn array_and_base_types() {
        assert!(VariableType::KeyValueArray.is_array());
        assert!(!VariableType::KeyValue.is_array());
        assert_eq!(VariableType::TcEntityArray.base_type(), VariableType::TcEntity);
        assert_eq!(VariableType::Raw.base_type(), VariableType::Raw);
        assert_eq!(VariableType::String.array_type(), Some(VariableType::StringArray));
        assert_eq!(VariableType::Raw.array_type(), None);
    }

    #[test]
    fn serde_uses_wire_tags() {
        let json = serde_json::to_string(&VariableType::TcEntityArray).unwrap();
        assert_eq!(json, "\"TCEntityArray\"");
        let back: VariableType = serde_json::from_str("\"TCEntity\"").unwrap();
        assert_eq!(back, VariableType::TcEntity);
    }
}
