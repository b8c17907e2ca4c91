//! Structural diffs
//!
//! Provides the line diff behind `eq`/`ne` details and the order-insensitive
//! [`deep_diff`] behind `dd`, `jeq` and `kveq`.

use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Largest LCS table built before falling back to a positional diff
const MAX_LCS_CELLS: usize = 4_000_000;

/// One step of a line diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// Line present on both sides
    Same,
    /// Line only in the app data, at this index
    Missing(usize),
    /// Line only in the test data, at this index
    Extra(usize),
}

/// Lines compared by the `eq` diff
///
/// Text on both sides is split on newlines; anything else is rendered as
/// pretty JSON.
#[must_use]
pub fn diff_lines(app: &Value, test: &Value) -> (Vec<String>, Vec<String>) {
    match (app, test) {
        (Value::String(a), Value::String(t)) => (split(a), split(t)),
        _ => (pretty_lines(app), pretty_lines(test)),
    }
}

fn split(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn pretty_lines(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| value.to_string())
        .lines()
        .map(str::to_string)
        .collect()
}

/// Insertions and deletions turning `app` into `test`
#[must_use]
pub fn line_diff(app: &[String], test: &[String]) -> Vec<LineOp> {
    let (n, m) = (app.len(), test.len());
    if n.saturating_mul(m) > MAX_LCS_CELLS {
        return positional_diff(app, test);
    }

    // lcs[i][j] = LCS length of app[i..] and test[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if app[i] == test[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if app[i] == test[j] {
            ops.push(LineOp::Same);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(LineOp::Missing(i));
            i += 1;
        } else {
            ops.push(LineOp::Extra(j));
            j += 1;
        }
    }
    ops.extend((i..n).map(LineOp::Missing));
    ops.extend((j..m).map(LineOp::Extra));
    ops
}

fn positional_diff(app: &[String], test: &[String]) -> Vec<LineOp> {
    let mut ops = Vec::new();
    for k in 0..app.len().max(test.len()) {
        match (app.get(k), test.get(k)) {
            (Some(a), Some(t)) if a == t => ops.push(LineOp::Same),
            (a, t) => {
                if a.is_some() {
                    ops.push(LineOp::Missing(k));
                }
                if t.is_some() {
                    ops.push(LineOp::Extra(k));
                }
            }
        }
    }
    ops
}

/// Render `eq` details, listing at most `max_diff` differences
#[must_use]
pub fn eq_details(app: &Value, test: &Value, max_diff: usize) -> String {
    let (app_lines, test_lines) = diff_lines(app, test);
    let mut details = String::new();
    let mut reported = 0;
    for op in line_diff(&app_lines, &test_lines) {
        let line = match op {
            LineOp::Same => continue,
            LineOp::Missing(i) => format!("\n    * Missing data at index {i}"),
            LineOp::Extra(j) => format!("\n    * Extra data at index {j}"),
        };
        if reported == max_diff {
            details.push_str("\n    * Max number of differences reached.");
            break;
        }
        details.push_str(&line);
        reported += 1;
    }
    if details.is_empty() && app != test {
        details.push_str("\n    * Values differ in type or representation");
    }
    details
}

/// Kind of a deep-diff discrepancy
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffKind {
    /// Same JSON kind, different value
    ValueChanged {
        /// App-side value
        app: Value,
        /// Test-side value
        test: Value,
    },
    /// Different JSON kinds
    TypeChanged {
        /// App-side value
        app: Value,
        /// Test-side value
        test: Value,
    },
    /// Object key only in the test data
    DictItemAdded {
        /// The unmatched value
        value: Value,
    },
    /// Object key only in the app data
    DictItemRemoved {
        /// The unmatched value
        value: Value,
    },
    /// Array member only in the test data
    IterableItemAdded {
        /// The unmatched value
        value: Value,
    },
    /// Array member only in the app data
    IterableItemRemoved {
        /// The unmatched value
        value: Value,
    },
}

/// One path-level discrepancy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    /// Location such as `root['data'][2]`
    pub path: String,
    /// What differs
    #[serde(flatten)]
    pub kind: DiffKind,
}

impl Display for Difference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiffKind::ValueChanged { app, test } => {
                write!(f, "value changed at {}: {app} -> {test}", self.path)
            }
            DiffKind::TypeChanged { app, test } => write!(
                f,
                "type changed at {}: {app} ({}) -> {test} ({})",
                self.path,
                kind_name(app),
                kind_name(test)
            ),
            DiffKind::DictItemAdded { value } => write!(f, "item added at {}: {value}", self.path),
            DiffKind::DictItemRemoved { value } => {
                write!(f, "item removed at {}: {value}", self.path)
            }
            DiffKind::IterableItemAdded { value } => {
                write!(f, "iterable item added at {}: {value}", self.path)
            }
            DiffKind::IterableItemRemoved { value } => {
                write!(f, "iterable item removed at {}: {value}", self.path)
            }
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Order-insensitive structural diff of `app` against `test`
///
/// Arrays compare as multisets: members with an equal counterpart (at any
/// position, ignoring nested order too) cancel out; the rest are reported as
/// added or removed at their own index.
#[must_use]
pub fn deep_diff(app: &Value, test: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    diff_at("root", app, test, &mut out);
    out
}

fn diff_at(path: &str, app: &Value, test: &Value, out: &mut Vec<Difference>) {
    match (app, test) {
        (Value::Object(a), Value::Object(t)) => {
            for (key, av) in a {
                let child = format!("{path}['{key}']");
                match t.get(key) {
                    Some(tv) => diff_at(&child, av, tv, out),
                    None => out.push(Difference {
                        path: child,
                        kind: DiffKind::DictItemRemoved { value: av.clone() },
                    }),
                }
            }
            for (key, tv) in t.iter().filter(|(k, _)| !a.contains_key(*k)) {
                out.push(Difference {
                    path: format!("{path}['{key}']"),
                    kind: DiffKind::DictItemAdded { value: tv.clone() },
                });
            }
        }
        (Value::Array(a), Value::Array(t)) => diff_multiset(path, a, t, out),
        _ if canonical(app) == canonical(test) => {}
        _ if kind_name(app) == kind_name(test) => out.push(Difference {
            path: path.to_string(),
            kind: DiffKind::ValueChanged {
                app: app.clone(),
                test: test.clone(),
            },
        }),
        _ => out.push(Difference {
            path: path.to_string(),
            kind: DiffKind::TypeChanged {
                app: app.clone(),
                test: test.clone(),
            },
        }),
    }
}

fn diff_multiset(path: &str, app: &[Value], test: &[Value], out: &mut Vec<Difference>) {
    let test_keys: Vec<String> = test.iter().map(canonical).collect();
    let mut matched = vec![false; test.len()];
    let mut removed = Vec::new();

    for (i, item) in app.iter().enumerate() {
        let key = canonical(item);
        match (0..test.len()).find(|&j| !matched[j] && test_keys[j] == key) {
            Some(j) => matched[j] = true,
            None => removed.push(i),
        }
    }

    for i in removed {
        out.push(Difference {
            path: format!("{path}[{i}]"),
            kind: DiffKind::IterableItemRemoved {
                value: app[i].clone(),
            },
        });
    }
    for (j, _) in matched.iter().enumerate().filter(|(_, m)| !**m) {
        out.push(Difference {
            path: format!("{path}[{j}]"),
            kind: DiffKind::IterableItemAdded {
                value: test[j].clone(),
            },
        });
    }
}

/// Order-free canonical text of a value (arrays sorted recursively)
fn canonical(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let mut keys: Vec<String> = items.iter().map(canonical).collect();
            keys.sort();
            format!("[{}]", keys.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical(v)))
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn line_diff_finds_insertions_and_deletions() {
        let ops = line_diff(&lines(&["a", "b", "c"]), &lines(&["a", "c", "d"]));
        assert_eq!(
            ops,
            vec![LineOp::Same, LineOp::Missing(1), LineOp::Same, LineOp::Extra(2)]
        );
    }

    #[test]
    fn positional_fallback() {
        let ops = positional_diff(&lines(&["a", "b"]), &lines(&["a"]));
        assert_eq!(ops, vec![LineOp::Same, LineOp::Missing(1)]);
    }

    #[test]
    fn eq_details_empty_when_equal() {
        assert_eq!(eq_details(&json!({"a": [1, 2]}), &json!({"a": [1, 2]}), 10), "");
    }

    #[test]
    fn eq_details_capped() {
        let app = json!((0..20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n"));
        let test = json!((20..40).map(|i| i.to_string()).collect::<Vec<_>>().join("\n"));
        let details = eq_details(&app, &test, 3);
        assert_eq!(details.matches("* Missing").count() + details.matches("* Extra").count(), 3);
        assert!(details.ends_with("Max number of differences reached."));
    }

    #[test]
    fn eq_details_distinguishes_text_from_number() {
        let details = eq_details(&json!("1"), &json!(1), 10);
        assert!(!details.is_empty());
    }

    #[test]
    fn deep_diff_ignores_order() {
        let app = json!([{"key": "a", "value": ["1", "2"]}, {"key": "b", "value": "x"}]);
        let test = json!([{"key": "b", "value": "x"}, {"key": "a", "value": ["2", "1"]}]);
        assert!(deep_diff(&app, &test).is_empty());
    }

    #[test]
    fn deep_diff_reports_paths() {
        let app = json!({"a": 1, "b": "x", "c": [1, 2]});
        let test = json!({"a": 2, "b": 3, "c": [2, 3], "d": null});
        let diffs = deep_diff(&app, &test);
        let paths: Vec<&str> = diffs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["root['a']", "root['b']", "root['c'][0]", "root['c'][1]", "root['d']"]);
        assert!(matches!(diffs[0].kind, DiffKind::ValueChanged { .. }));
        assert!(matches!(diffs[1].kind, DiffKind::TypeChanged { .. }));
        assert!(matches!(diffs[2].kind, DiffKind::IterableItemRemoved { .. }));
        assert!(matches!(diffs[3].kind, DiffKind::IterableItemAdded { .. }));
        assert!(matches!(diffs[4].kind, DiffKind::DictItemAdded { .. }));
    }

    #[test]
    fn deep_diff_counts_duplicates() {
        let diffs = deep_diff(&json!(["a", "a"]), &json!(["a"]));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].to_string(), "iterable item removed at root[1]: \"a\"");
    }
}
