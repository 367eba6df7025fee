//! Property-based tests for error normalization
//!
//! `normalize` is total: every payload shape yields a record with a message.

use proptest::prelude::*;
use roster_core::http::{normalize, DEFAULT_ERROR_MESSAGE};
use serde_json::{json, Value};

/// Strategy for payloads that are neither objects nor strings
fn non_mapping_payload() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| json!(f)),
        proptest::collection::vec(any::<i32>(), 0..8).prop_map(|v| json!(v)),
    ]
}

/// Strategy for arbitrary JSON values, a few levels deep
fn any_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _]{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            proptest::collection::hash_map("[a-z]{1,10}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn non_mapping_payloads_use_default_message(status in any::<u16>(), payload in non_mapping_payload()) {
        let record = normalize(status, &payload);
        prop_assert_eq!(record.status, status);
        prop_assert_eq!(record.message.as_str(), DEFAULT_ERROR_MESSAGE);
        prop_assert_eq!(&record.raw, &payload);
        prop_assert!(record.error.is_none());
        prop_assert!(record.details.is_none());
        prop_assert!(record.path.is_none());
        prop_assert!(record.timestamp.is_none());
    }

    #[test]
    fn message_and_error_fields_are_copied(
        status in any::<u16>(),
        message in "[ -~]{0,40}",
        error in "[a-z_]{1,20}",
    ) {
        let payload = json!({"message": message.clone(), "error": error.clone()});
        let record = normalize(status, &payload);
        prop_assert_eq!(record.message, message);
        prop_assert_eq!(record.error, Some(error));
        prop_assert_eq!(record.raw, payload);
    }

    #[test]
    fn string_payloads_become_the_message(status in any::<u16>(), text in ".{0,60}") {
        let record = normalize(status, &Value::String(text.clone()));
        prop_assert_eq!(record.message, text);
    }

    #[test]
    fn normalize_is_total(status in any::<u16>(), payload in any_json()) {
        let record = normalize(status, &payload);
        prop_assert_eq!(record.status, status);
        prop_assert_eq!(record.raw, payload);
    }
}
