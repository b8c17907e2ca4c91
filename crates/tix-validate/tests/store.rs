//! Functional tests for store-side validation.
//!
//! Core guarantees exercised here:
//! - Missing or empty variables fail `not_null` without erroring.
//! - Stored shapes are checked strictly against the variable type.
//! - Assertions report App Data, Expected Data and Details on failure.
//! - Unknown operators fail rather than error.

use serde_json::json;
use tix_compare::CompareOptions;
use tix_playbook::KvStore;
use tix_test_utils::{client_with, init_tracing};
use tix_validate::{StoreValidator, ValidatorConfig};
use tix_variable::{KeyValue, TypedValue};

fn options() -> CompareOptions {
    CompareOptions::new()
}

#[test]
fn not_null() {
    init_tracing();
    let client = client_with(
        "ctx",
        &[
            ("#App:1:name!String", TypedValue::from("alpha")),
            ("#App:1:blank!String", TypedValue::from("")),
        ],
    );
    let validator = StoreValidator::new(&client);
    assert!(validator.not_null("#App:1:name!String").unwrap());
    assert!(!validator.not_null("#App:1:blank!String").unwrap());
    assert!(!validator.not_null("#App:1:missing!String").unwrap());
    assert!(!validator.not_null("").unwrap());
}

#[test]
fn type_matches_is_strict() {
    init_tracing();
    let client = client_with(
        "ctx",
        &[
            ("#App:1:ips!StringArray", TypedValue::StringArray(vec!["1.1.1.1".into()])),
            ("#App:1:kv!KeyValue", KeyValue::new("k", "v").into()),
        ],
    );
    // a scalar written under an array type by some other producer
    client
        .store()
        .hset("ctx", "#App:1:loose!StringArray", br#""one""#)
        .unwrap();

    let validator = StoreValidator::new(&client);
    assert!(validator.type_matches("#App:1:ips!StringArray").unwrap());
    assert!(validator.type_matches("#App:1:kv!KeyValue").unwrap());
    assert!(!validator.type_matches("#App:1:loose!StringArray").unwrap());
    assert!(!validator.type_matches("#App:1:absent!String").unwrap());
}

/// Tenet: an empty stored array counts as not found, not as a type mismatch.
#[test]
fn type_matches_empty_array() {
    init_tracing();
    let client = client_with("ctx", &[]);
    client.store().hset("ctx", "#App:1:empty!StringArray", b"[]").unwrap();
    client.store().hset("ctx", "#App:1:none!StringArray", b"null").unwrap();

    let validator = StoreValidator::new(&client);
    assert!(!validator.type_matches("#App:1:empty!StringArray").unwrap());
    assert!(!validator.type_matches("#App:1:none!StringArray").unwrap());
}

/// Tenet: a mismatch is a failed outcome with a readable assertion message.
#[test]
fn data_assertion_messages() {
    init_tracing();
    let client = client_with("ctx", &[("#App:1:out!String", TypedValue::from("hello"))]);
    let validator = StoreValidator::new(&client);

    let pass = validator
        .data("#App:1:out!String", &json!("hello"), None, &options())
        .unwrap();
    assert!(pass.passed);

    let fail = validator
        .data("#App:1:out!String", &json!("world"), Some("eq"), &options())
        .unwrap();
    assert!(!fail.passed);
    assert!(fail.assert_error.starts_with("\n App Data     : \"hello\"\n Expected Data: \"world\"\n Details      : "));
}

/// Tenet: the configured diff cap bounds the reported details.
#[test]
fn config_caps_diff_details() {
    init_tracing();
    let client = client_with("ctx", &[("#App:1:out!String", TypedValue::from("a\nb\nc"))]);
    let config = ValidatorConfig::from_toml_str("max_diff = 1").unwrap();
    let validator = StoreValidator::with_config(&client, &config);
    assert_eq!(validator.engine().max_diff(), 1);

    let fail = validator
        .data("#App:1:out!String", &json!("x\ny\nz"), Some("eq"), &options())
        .unwrap();
    assert!(!fail.passed);
    let reported = fail
        .assert_error
        .lines()
        .filter(|l| l.contains("* Missing data") || l.contains("* Extra data"))
        .count();
    assert_eq!(reported, 1);
    assert!(fail.assert_error.contains("* Max number of differences reached."));

    let uncapped = StoreValidator::new(&client)
        .data("#App:1:out!String", &json!("x\ny\nz"), Some("eq"), &options())
        .unwrap();
    assert!(uncapped.assert_error.matches("* ").count() > 1);
}

#[test]
fn operators_through_store() {
    init_tracing();
    let client = client_with(
        "ctx",
        &[
            ("#App:1:count!String", TypedValue::from("42")),
            ("#App:1:ips!StringArray", TypedValue::StringArray(vec!["b".into(), "a".into()])),
        ],
    );
    let validator = StoreValidator::new(&client);
    let check = |var: &str, expected, op| {
        validator
            .data(var, &expected, Some(op), &options())
            .unwrap()
            .passed
    };
    assert!(check("#App:1:count!String", json!(40), "gt"));
    assert!(check("#App:1:count!String", json!("^4"), "rex"));
    assert!(check("#App:1:ips!StringArray", json!(["a", "b"]), "dd"));
    assert!(check("#App:1:count!String", json!("43"), "ne"));
    assert!(!check("#App:1:count!String", json!("42"), "ne"));
}

#[test]
fn unknown_operator_fails() {
    init_tracing();
    let client = client_with("ctx", &[("#App:1:out!String", TypedValue::from("x"))]);
    let outcome = StoreValidator::new(&client)
        .data("#App:1:out!String", &json!("x"), Some("~~"), &options())
        .unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.assert_error, "invalid operator provided (~~)");

    let missing = StoreValidator::new(&client)
        .data("", &json!("x"), None, &options())
        .unwrap();
    assert!(!missing.passed);
}
