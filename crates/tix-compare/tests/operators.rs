//! Functional tests for comparison operators.
//!
//! Core guarantees exercised here:
//! - `eq` of a value with itself passes with no details.
//! - `eq` of different values fails with details that never list more than
//!   the configured number of differences.
//! - Deep diffs ignore array order at every depth.

use proptest::prelude::*;
use serde_json::{json, Value};
use tix_compare::{CompareOptions, ComparisonEngine};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn listed_differences(details: &str) -> usize {
    details.matches("* Missing data").count() + details.matches("* Extra data").count()
}

proptest! {
    /// Tenet: a value always equals itself, silently.
    #[test]
    fn prop_eq_is_reflexive(value in json_value(), max_diff in 0usize..12) {
        let result = ComparisonEngine::new(max_diff).eq(&value, &value);
        prop_assert!(result.passed);
        prop_assert!(result.details.is_empty());
    }

    /// Tenet: mismatch details are non-empty and bounded.
    #[test]
    fn prop_eq_mismatch_is_bounded(a in json_value(), b in json_value(), max_diff in 0usize..12) {
        prop_assume!(a != b);
        let result = ComparisonEngine::new(max_diff).eq(&a, &b);
        prop_assert!(!result.passed);
        prop_assert!(!result.details.is_empty());
        prop_assert!(listed_differences(&result.details) <= max_diff);
    }

    #[test]
    fn prop_deep_diff_ignores_order(items in proptest::collection::vec(json_value(), 0..6)) {
        let mut reversed = items.clone();
        reversed.reverse();
        let result = ComparisonEngine::default()
            .compare("dd", &Value::from(items), &Value::from(reversed), &CompareOptions::new());
        prop_assert!(result.passed, "{}", result.details);
    }
}

#[test]
fn max_diff_caps_long_text() {
    let app: String = (0..100).map(|i| format!("line {i}\n")).collect();
    let test: String = (0..100).map(|i| format!("other {i}\n")).collect();
    let result = ComparisonEngine::new(10).eq(&json!(app), &json!(test));
    assert_eq!(listed_differences(&result.details), 10);
    assert!(result.details.ends_with("\n    * Max number of differences reached."));
}

#[test]
fn key_value_arrays_compare_without_excluded_keys() {
    let engine = ComparisonEngine::default();
    let options = CompareOptions::new().with_exclude_keys(["timestamp"]);
    let app = json!([
        {"key": "timestamp", "value": "2024-01-01"},
        {"key": "ips", "value": ["1.1.1.1", "2.2.2.2"]}
    ]);
    let test = json!([
        {"key": "ips", "value": ["2.2.2.2", "1.1.1.1"]},
        {"key": "timestamp", "value": "2025-01-01"}
    ]);
    assert!(engine.compare("kveq", &app, &test, &options).passed);
    assert!(!engine.compare("kveq", &app, &test, &CompareOptions::new()).passed);
}
