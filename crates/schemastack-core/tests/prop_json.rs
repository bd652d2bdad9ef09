//! Property-based tests for the JSON value boundary

use proptest::prelude::*;
use schemastack_core::json::{self, canonical_form, json_equal};
use schemastack_core::ParseError;
use serde_json::{Map, Value};

fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::from),
        "[a-d]{0,3}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-d]{1,2}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// Same value with every object's keys in reverse order
fn reversed(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .rev()
                .map(|(k, v)| (k.clone(), reversed(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn key_order_does_not_matter(value in value_strategy()) {
        let other = reversed(&value);
        prop_assert!(json_equal(&value, &other));
        prop_assert_eq!(canonical_form(&value), canonical_form(&other));
    }

    #[test]
    fn canonical_form_agrees_with_equality(a in value_strategy(), b in value_strategy()) {
        prop_assert_eq!(canonical_form(&a) == canonical_form(&b), json_equal(&a, &b));
    }

    #[test]
    fn parse_accepts_serialized_values(value in value_strategy()) {
        let text = serde_json::to_string_pretty(&value).unwrap();
        prop_assert_eq!(json::parse(&text).unwrap(), value);
    }

    #[test]
    fn parse_rejects_duplicate_keys(key in "[a-z]{1,5}", depth in 0usize..4) {
        let mut text = format!(r#"{{"{key}": 1, "{key}": 2}}"#);
        for _ in 0..depth {
            text = format!(r#"{{"outer": [{text}]}}"#);
        }
        match json::parse(&text) {
            Err(ParseError::DuplicateKey { key: found, .. }) => prop_assert_eq!(found, key),
            other => prop_assert!(false, "expected a duplicate key error, got {:?}", other),
        }
    }
}
