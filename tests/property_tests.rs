//! Property-based tests for the adapter
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs, catching edge cases that hand-written tests might miss.

use babeltest::Command;
use babeltest::assertions::{check_contains, values_equal};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

// =============================================================================
// Assertion Properties
// =============================================================================

proptest! {
    /// Property: exact equality is reflexive
    #[test]
    fn values_equal_is_reflexive(v in json_value()) {
        prop_assert!(values_equal(&v, &v));
    }

    /// Property: every value contains itself
    #[test]
    fn contains_is_reflexive(v in json_value()) {
        prop_assert!(check_contains(&v, &v, "").is_ok());
    }

    /// Property: contains is never stricter than exact
    #[test]
    fn exact_implies_contains(a in json_value(), b in json_value()) {
        if values_equal(&a, &b) {
            prop_assert!(check_contains(&a, &b, "").is_ok());
        }
    }

    /// Property: dropping keys from an expected object keeps it contained
    #[test]
    fn object_subsets_are_contained(
        fields in prop::collection::btree_map("[a-z]{1,4}", json_value(), 1..6),
        keep in prop::collection::vec(any::<bool>(), 6),
    ) {
        let actual = Value::Object(fields.clone().into_iter().collect());
        let subset: Map<String, Value> = fields
            .into_iter()
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|(entry, _)| entry)
            .collect();
        prop_assert!(check_contains(&actual, &Value::Object(subset), "").is_ok());
    }

    /// Property: list containment ignores order
    #[test]
    fn list_containment_ignores_order(items in prop::collection::vec(json_value(), 0..6)) {
        let actual = Value::Array(items.clone());
        let reversed = Value::Array(items.into_iter().rev().collect());
        prop_assert!(check_contains(&actual, &reversed, "").is_ok());
    }
}

// =============================================================================
// Protocol Properties
// =============================================================================

proptest! {
    /// Property: the command parser never panics, whatever the line
    #[test]
    fn command_parse_never_panics(line in ".{0,200}") {
        let _ = Command::parse(&line);
    }

    /// Property: any JSON object with a string action parses
    #[test]
    fn objects_with_action_parse(action in "[a-z_]{1,12}", extra in json_value()) {
        let line = serde_json::json!({"action": action, "data": extra}).to_string();
        let command = Command::parse(&line);
        prop_assert!(command.is_ok(), "{line}: {command:?}");
    }
}
