//! Multiset comparisons of entity metadata
//!
//! Each helper returns one message per discrepancy, prefixed with the
//! caller's error type (e.g. `TagError: `). No messages means a match.

use indexmap::IndexMap;
use std::fmt::Display;

/// Compare expected and actual `name -> value` maps
///
/// Values are compared by their text form.
#[must_use]
pub fn compare_dicts<V: Display>(
    expected: &IndexMap<String, V>,
    actual: &IndexMap<String, V>,
    error_type: &str,
) -> Vec<String> {
    let mut errors = Vec::new();
    for (key, value) in expected {
        match actual.get(key) {
            Some(found) if found.to_string() != value.to_string() => errors.push(format!(
                "{error_type}{key} : {value} did not match {key} : {found}"
            )),
            Some(_) => {}
            None => errors.push(format!(
                "{error_type}{key} : {value} was in expected results but not in actual results."
            )),
        }
    }
    for (key, value) in actual.iter().filter(|(k, _)| !expected.contains_key(*k)) {
        errors.push(format!(
            "{error_type}{key} : {value} was in actual results but not in expected results."
        ));
    }
    errors
}

/// Compare expected and actual lists as multisets
#[must_use]
pub fn compare_lists<T: PartialEq + Display>(expected: &[T], actual: &[T], error_type: &str) -> Vec<String> {
    let mut remaining: Vec<&T> = actual.iter().collect();
    let mut errors = Vec::new();
    for item in expected {
        match remaining.iter().position(|a| *a == item) {
            Some(pos) => {
                remaining.swap_remove(pos);
            }
            None => errors.push(format!(
                "{error_type}{item} was in expected results but not in actual results."
            )),
        }
    }
    let mut leftovers: Vec<String> = remaining.iter().map(|item| item.to_string()).collect();
    leftovers.sort();
    for item in leftovers {
        errors.push(format!(
            "{error_type}{item} was in actual results but not in expected results."
        ));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn dicts_match() {
        let a = map(&[("Description", "x"), ("Source", "y")]);
        let b = map(&[("Source", "y"), ("Description", "x")]);
        assert!(compare_dicts(&a, &b, "AttributeError: ").is_empty());
    }

    #[test]
    fn dict_discrepancies() {
        let expected = map(&[("Description", "x"), ("Source", "y")]);
        let actual = map(&[("Description", "z"), ("Title", "t")]);
        assert_eq!(
            compare_dicts(&expected, &actual, "AttributeError: "),
            vec![
                "AttributeError: Description : x did not match Description : z".to_string(),
                "AttributeError: Source : y was in expected results but not in actual results."
                    .to_string(),
                "AttributeError: Title : t was in actual results but not in expected results."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn lists_are_multisets() {
        let expected = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let actual = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(
            compare_lists(&expected, &actual, "TagError: "),
            vec![
                "TagError: a was in expected results but not in actual results.".to_string(),
                "TagError: c was in actual results but not in expected results.".to_string(),
            ]
        );
        assert!(compare_lists(&expected, &["a", "b", "a"].map(String::from), "").is_empty());
    }
}
