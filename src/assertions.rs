//! Judging outcomes against expectations.
//!
//! Every check returns `Err(message)` on mismatch. Messages name the JSON path of the first
//! difference (`Mismatch at 'profile.address.city': expected "Paris", got "Lyon"`).

use babeltest_core::Raised;
use babeltest_core::Returned;
use babeltest_core::lang::expectations::ExpectKind;
use babeltest_core::reflect::json_kind_name;
use serde_json::Value;

use crate::diagnostics::render_value;
use crate::mocks::CallTracker;
use crate::protocol::{CalledAssertion, Expectation, ThrowsExpectation};

const MAX_RENDERED: usize = 200;

fn render(value: &Value) -> String {
    render_value(value, MAX_RENDERED)
}

fn at(path: &str) -> String {
    if path.is_empty() { String::new() } else { format!(" at '{path}'") }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() { key.to_string() } else { format!("{path}.{key}") }
}

pub fn check_expectation(returned: &Returned, expect: &Expectation) -> Result<(), String> {
    let actual = &returned.value;
    let expected = &expect.value;
    match expect.kind {
        ExpectKind::Exact => {
            if values_equal(actual, expected) {
                Ok(())
            } else {
                Err(format!("Expected {}, got {}", render(expected), render(actual)))
            }
        }
        ExpectKind::Contains => check_contains(actual, expected, ""),
        ExpectKind::Type => {
            let Some(wanted) = expected.as_str() else {
                return Err(format!("TYPE expectation needs a type name string, got {}", render(expected)));
            };
            let kind = returned.kind_name();
            if kind == wanted {
                Ok(())
            } else {
                Err(format!("Expected type {wanted}, got {kind}"))
            }
        }
        ExpectKind::Null => match actual {
            Value::Null => Ok(()),
            other => Err(format!("Expected null, got {}", render(other))),
        },
        ExpectKind::NotNull => match actual {
            Value::Null => Err("Expected non-null value, got null".to_string()),
            _ => Ok(()),
        },
        ExpectKind::True => match actual {
            Value::Bool(true) => Ok(()),
            other => Err(format!("Expected true, got {}", render(other))),
        },
        ExpectKind::False => match actual {
            Value::Bool(false) => Ok(()),
            other => Err(format!("Expected false, got {}", render(other))),
        },
    }
}

/// Structural equality where numbers compare numerically (`5 == 5.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y)),
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Partial recursive match of `actual` against `expected`.
///
/// - objects: every expected key present and matching; extra keys ignored; an expected `null`
///   is satisfied by an absent key
/// - arrays: every expected element matched by a distinct actual element, in any order
/// - scalars: [`values_equal`]
pub fn check_contains(actual: &Value, expected: &Value, path: &str) -> Result<(), String> {
    match expected {
        Value::Object(expected_fields) => {
            let Value::Object(actual_fields) = actual else {
                return Err(format!("Expected object with keys{}, got {}", at(path), json_kind_name(actual)));
            };
            for (key, expected_value) in expected_fields {
                let found = actual_fields.get(key).or_else(|| {
                    actual_fields
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(key))
                        .map(|(_, v)| v)
                });
                let key_path = child_path(path, key);
                match found {
                    None if expected_value.is_null() => {}
                    None => return Err(format!("Missing key '{key}'{}", at(path))),
                    Some(actual_value) => check_contains(actual_value, expected_value, &key_path)?,
                }
            }
            Ok(())
        }
        Value::Array(expected_items) => {
            let Value::Array(actual_items) = actual else {
                return Err(format!("Expected list{}, got {}", at(path), json_kind_name(actual)));
            };
            match unmatched_item(actual_items, expected_items) {
                None => Ok(()),
                Some(idx) => Err(format!(
                    "Expected item {} not found in list{}",
                    render(&expected_items[idx]),
                    at(path)
                )),
            }
        }
        Value::Null => match actual {
            Value::Null => Ok(()),
            other => Err(mismatch(path, expected, other)),
        },
        scalar => {
            if values_equal(actual, scalar) {
                Ok(())
            } else {
                Err(mismatch(path, scalar, actual))
            }
        }
    }
}

fn mismatch(path: &str, expected: &Value, actual: &Value) -> String {
    if path.is_empty() {
        format!("Expected {}, got {}", render(expected), render(actual))
    } else {
        format!("Mismatch at '{path}': expected {}, got {}", render(expected), render(actual))
    }
}

/// Multiset containment via bipartite matching (augmenting paths).
///
/// Returns the index of an expected item left unmatched by a maximum matching, if any.
fn unmatched_item(actual: &[Value], expected: &[Value]) -> Option<usize> {
    let candidates: Vec<Vec<usize>> = expected
        .iter()
        .map(|e| {
            actual
                .iter()
                .enumerate()
                .filter(|(_, a)| check_contains(a, e, "").is_ok())
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    fn augment(e: usize, candidates: &[Vec<usize>], owner: &mut [Option<usize>], seen: &mut [bool]) -> bool {
        for &a in &candidates[e] {
            if seen[a] {
                continue;
            }
            seen[a] = true;
            let free = match owner[a] {
                None => true,
                Some(other) => augment(other, candidates, owner, seen),
            };
            if free {
                owner[a] = Some(e);
                return true;
            }
        }
        false
    }

    let mut owner: Vec<Option<usize>> = vec![None; actual.len()];
    for e in 0..expected.len() {
        let mut seen = vec![false; actual.len()];
        if !augment(e, &candidates, &mut owner, &mut seen) {
            return Some(e);
        }
    }
    None
}

pub fn check_throws(raised: &Raised, throws: &ThrowsExpectation) -> Result<(), String> {
    if let Some(kind) = &throws.kind {
        if &raised.kind != kind {
            return Err(format!("Expected {kind}, got {}: {}", raised.kind, raised.message));
        }
    }
    if let Some(fragment) = &throws.message {
        if !raised.message.contains(fragment.as_str()) {
            return Err(format!(
                "Expected message containing '{fragment}', got '{}'",
                raised.message
            ));
        }
    }
    Ok(())
}

pub fn check_called(tracker: &CallTracker, called: &CalledAssertion) -> Result<(), String> {
    let calls = tracker
        .calls_for_target(&called.target)
        .ok_or_else(|| format!("CALLED target '{}' must name a member as Type.member", called.target))?;
    let matcher = called.with_args.as_ref().filter(|w| !w.is_null());
    let matching = match matcher {
        Some(with) => calls.iter().filter(|c| check_contains(c, with, "").is_ok()).count(),
        None => calls.len(),
    };
    let with_text = matcher.map(|w| format!(" with {}", render(w))).unwrap_or_default();

    let ok = match called.times {
        Some(times) => matching == times,
        None => matching > 0,
    };
    if ok {
        return Ok(());
    }

    let wanted = match called.times {
        Some(1) => "once".to_string(),
        Some(times) => format!("{times} times"),
        None => "at least once".to_string(),
    };
    let mut message = format!(
        "Expected {} to be called {wanted}{with_text}, but it was called {matching} time(s)",
        called.target
    );
    if matcher.is_some() && !calls.is_empty() {
        message.push_str(&format!("; recorded calls: {}", render(&Value::Array(calls))));
    }
    Err(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expect(kind: ExpectKind, value: Value) -> Expectation {
        Expectation { kind, value }
    }

    #[test]
    fn test_exact_is_numeric_tolerant() {
        assert!(check_expectation(&Returned::new(5), &expect(ExpectKind::Exact, json!(5.0))).is_ok());
        let err = check_expectation(&Returned::new(5), &expect(ExpectKind::Exact, json!(6))).unwrap_err();
        assert_eq!(err, "Expected 6, got 5");
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_contains_objects() {
        let user = json!({"id": 1, "name": "Kohl", "profile": {"address": {"city": "Paris"}}});
        assert!(check_contains(&user, &json!({}), "").is_ok());
        assert!(check_contains(&user, &json!({"Name": "Kohl"}), "").is_ok());
        assert!(check_contains(&user, &json!({"missing": null}), "").is_ok());
        assert_eq!(
            check_contains(&user, &json!({"profile": {"address": {"city": "Lyon"}}}), "").unwrap_err(),
            r#"Mismatch at 'profile.address.city': expected "Lyon", got "Paris""#
        );
        assert_eq!(
            check_contains(&user, &json!({"profile": {"phone": "1"}}), "").unwrap_err(),
            "Missing key 'phone' at 'profile'"
        );
        assert_eq!(check_contains(&json!([1]), &json!({}), "").unwrap_err(), "Expected object with keys, got list");
    }

    #[test]
    fn test_contains_lists_are_multisets() {
        let actual = json!([{"name": "Kohl", "role": "admin"}, {"name": "Alice"}, 3]);
        assert!(check_contains(&actual, &json!([{"name": "Alice"}, {"name": "Kohl"}]), "").is_ok());
        assert!(check_contains(&json!([1, 2]), &json!([1, 1]), "").is_err());
        // Greedy matching would pair {} with the first item and fail; augmenting paths don't.
        assert!(check_contains(&json!([{"a": 1}, {"b": 2}]), &json!([{}, {"a": 1}]), "").is_ok());
        assert_eq!(
            check_contains(&json!({"tags": ["x"]}), &json!({"tags": ["y"]}), "").unwrap_err(),
            r#"Expected item "y" not found in list at 'tags'"#
        );
    }

    #[test]
    fn test_type_uses_declared_name() {
        let user = Returned {
            value: json!({"id": 1}),
            type_name: Some("User".into()),
        };
        assert!(check_expectation(&user, &expect(ExpectKind::Type, json!("User"))).is_ok());
        assert!(check_expectation(&Returned::new(1.5), &expect(ExpectKind::Type, json!("float"))).is_ok());
        assert_eq!(
            check_expectation(&Returned::null(), &expect(ExpectKind::Type, json!("User"))).unwrap_err(),
            "Expected type User, got null"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(check_expectation(&Returned::null(), &expect(ExpectKind::Null, Value::Null)).is_ok());
        assert!(check_expectation(&Returned::null(), &expect(ExpectKind::NotNull, Value::Null)).is_err());
        assert!(check_expectation(&Returned::new(true), &expect(ExpectKind::True, Value::Null)).is_ok());
        assert_eq!(
            check_expectation(&Returned::new(1), &expect(ExpectKind::True, Value::Null)).unwrap_err(),
            "Expected true, got 1"
        );
        assert!(check_expectation(&Returned::new(false), &expect(ExpectKind::False, Value::Null)).is_ok());
    }

    #[test]
    fn test_throws_parts_are_independent() {
        let raised = Raised::new("ArgumentException", "Cannot divide by zero");
        let only_kind = ThrowsExpectation {
            kind: Some("ArgumentException".into()),
            ..Default::default()
        };
        let only_message = ThrowsExpectation {
            message: Some("divide".into()),
            ..Default::default()
        };
        assert!(check_throws(&raised, &only_kind).is_ok());
        assert!(check_throws(&raised, &only_message).is_ok());
        let both_wrong_message = ThrowsExpectation {
            kind: Some("ArgumentException".into()),
            message: Some("overflow".into()),
            code: None,
        };
        assert_eq!(
            check_throws(&raised, &both_wrong_message).unwrap_err(),
            "Expected message containing 'overflow', got 'Cannot divide by zero'"
        );
    }

    #[test]
    fn test_called_counts_and_filters() {
        let tracker = CallTracker::new();
        tracker.record("EmailService.send", json!({"to": "a@x", "subject": "hi"}));
        tracker.record("EmailService.send", json!({"to": "b@x", "subject": "hi"}));

        let called = |with_args: Option<Value>, times: Option<usize>| CalledAssertion {
            target: "EmailService.send".into(),
            with_args,
            times,
        };
        assert!(check_called(&tracker, &called(None, None)).is_ok());
        assert!(check_called(&tracker, &called(None, Some(2))).is_ok());
        assert!(check_called(&tracker, &called(Some(json!({"to": "a@x"})), Some(1))).is_ok());

        let err = check_called(&tracker, &called(Some(json!({"to": "c@x"})), None)).unwrap_err();
        assert!(err.starts_with(r#"Expected EmailService.send to be called at least once with {"to":"c@x"}, but it was called 0 time(s)"#));
        assert!(err.contains("recorded calls:"));

        let err = check_called(&CallTracker::new(), &called(None, Some(1))).unwrap_err();
        assert_eq!(err, "Expected EmailService.send to be called once, but it was called 0 time(s)");
    }
}
