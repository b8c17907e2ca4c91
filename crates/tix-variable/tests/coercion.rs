//! Functional tests for value coercion.
//!
//! Core guarantees exercised here:
//! - A scalar coerced into an array type becomes a one-member sequence, and
//!   an existing sequence passes through unchanged.
//! - Key/value pairs with unknown fields are rejected at any depth.
//! - Emptiness is judged on the innermost value and only tolerated by the
//!   may-be-empty variant of a type.

use proptest::prelude::*;
use serde_json::{json, Value};
use tix_variable::{coerce, coerce_as, CoercionError, FieldSpec, RawValue, TypedValue, VariableType};

/// Tenet: wrapping a scalar is idempotent.
///
/// Coercing `"a"` into a `StringArray` gives `["a"]`; coercing `["a"]` gives
/// the same thing again.
#[test]
fn scalar_wraps_into_single_member_array() {
    let wrapped = coerce_as(VariableType::StringArray, json!("a").into()).unwrap();
    assert_eq!(wrapped, TypedValue::StringArray(vec!["a".into()]));

    let again = coerce_as(VariableType::StringArray, wrapped.to_raw()).unwrap();
    assert_eq!(again, wrapped);
}

#[test]
fn key_value_wraps_into_key_value_array() {
    let member = json!({"key": "k", "value": "v"});
    let wrapped = coerce_as(VariableType::KeyValueArray, member.clone().into()).unwrap();
    let expected = coerce_as(VariableType::KeyValueArray, json!([member]).into()).unwrap();
    assert_eq!(wrapped, expected);
    assert_eq!(wrapped.len(), 1);
}

proptest! {
    #[test]
    fn prop_string_array_round_trips(items in proptest::collection::vec("[a-z]{1,6}", 1..6)) {
        let raw = RawValue::Json(Value::from(items.clone()));
        let value = coerce_as(VariableType::StringArray, raw).unwrap();
        prop_assert_eq!(&value, &TypedValue::StringArray(items));
        let again = coerce_as(VariableType::StringArray, value.to_raw()).unwrap();
        prop_assert_eq!(again, value);
    }

    #[test]
    fn prop_scalar_wrap_matches_explicit_array(item in "[a-z]{1,6}") {
        let wrapped = coerce_as(VariableType::StringArray, json!(item).into()).unwrap();
        let explicit = coerce_as(VariableType::StringArray, json!([item]).into()).unwrap();
        prop_assert_eq!(wrapped, explicit);
    }
}

/// Tenet: unknown fields never slip through.
///
/// Silently dropping `other` would lose data the producer meant to send.
#[test]
fn extra_field_rejected_at_every_depth() {
    let bad = json!({"key": "k", "value": "v", "other": "x"});

    let top = coerce_as(VariableType::KeyValue, bad.clone().into()).unwrap_err();
    assert!(matches!(top, CoercionError::InvalidElement { index: 0, .. }));

    let in_array = coerce_as(
        VariableType::KeyValueArray,
        json!([{"key": "a", "value": "1"}, bad.clone()]).into(),
    )
    .unwrap_err();
    assert!(matches!(in_array, CoercionError::InvalidElement { index: 1, .. }));

    let nested = coerce_as(VariableType::KeyValue, json!({"key": "outer", "value": bad}).into())
        .unwrap_err();
    assert!(matches!(nested, CoercionError::InvalidElement { .. }));
}

/// Tenet: an empty innermost value makes the member empty.
#[test]
fn empty_values_need_the_optional_variant() {
    let empties = [
        json!({"key": "k", "value": null}),
        json!({"key": "k", "value": ""}),
        json!({"key": "k", "value": []}),
    ];

    for ty in [VariableType::KeyValue, VariableType::KeyValueArray] {
        for empty in &empties {
            let strict = coerce(&FieldSpec::required(ty), empty.clone().into());
            assert!(
                matches!(strict, Err(CoercionError::EmptyMemberNotAllowed { index: 0, .. })),
                "{ty} accepted {empty}"
            );

            let lenient = coerce(&FieldSpec::required(ty).allow_empty(), empty.clone().into());
            assert!(lenient.is_ok(), "{ty} rejected {empty}: {lenient:?}");
        }
    }
}

#[test]
fn scalar_field_rejects_multi_member_array() {
    let err = coerce_as(VariableType::String, json!(["a", "b"]).into()).unwrap_err();
    assert_eq!(
        err,
        CoercionError::ArrayNotAllowed {
            ty: VariableType::String,
            len: 2
        }
    );
    let single = coerce_as(VariableType::String, json!(["a"]).into()).unwrap();
    assert_eq!(single, TypedValue::String("a".into()));
}
