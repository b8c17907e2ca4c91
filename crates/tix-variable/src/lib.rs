//! tix Variable - Playbook variable model
//!
//! The typed data interchange between automation apps and the shared
//! key-value store:
//! - Parses and formats `#App:<id>:<name>!<Type>` addresses
//! - Enumerates the supported value types and their structural validators
//! - Coerces loosely-typed input into the strict [`TypedValue`] form
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tix_variable::{coerce_as, TypedValue, Variable, VariableType};
//!
//! let var = Variable::parse("#App:1:names!StringArray").unwrap();
//! assert_eq!(var.kind(), VariableType::StringArray);
//!
//! let value = coerce_as(var.kind(), json!("a").into()).unwrap();
//! assert_eq!(value, TypedValue::StringArray(vec!["a".into()]));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod address;
mod coerce;
mod registry;
mod value;
mod variable_type;

pub use address::{
    AddressError, Variable, APP_NAMESPACE, SELECT_SENTINEL, VARIABLE_INPUT_SENTINEL,
};
pub use coerce::{
    coerce, coerce_as, is_empty_member, is_empty_nested, normalize_shape, Coercer,
    CoercionError, FieldSpec, Shaped,
};
pub use registry::{parse_entity, parse_key_value, MemberParser, TypeRegistry, Violation};
pub use value::{json_kind, KeyValue, RawValue, TcEntity, TypedValue};
pub use variable_type::VariableType;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
