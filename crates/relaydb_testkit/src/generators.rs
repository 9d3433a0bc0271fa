//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random keys, key ranges, and record
//! values that respect the engine's key model.

use proptest::prelude::*;
use relaydb_core::{Key, KeyRange};
use serde_json::{Map, Value};

/// Strategy for generating engine keys across all variants.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        any::<i64>().prop_map(Key::Int),
        prop::string::string_regex("[a-z0-9]{0,12}")
            .expect("Invalid regex")
            .prop_map(Key::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Key::Bytes),
    ]
}

/// Strategy for generating integer keys only.
pub fn int_key_strategy() -> impl Strategy<Value = Key> {
    any::<i64>().prop_map(Key::Int)
}

/// Strategy for generating valid store names.
pub fn store_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating key ranges, including unbounded and open-ended
/// ones.
pub fn key_range_strategy() -> impl Strategy<Value = KeyRange> {
    (
        prop::option::of(key_strategy()),
        prop::option::of(key_strategy()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(lower, upper, lower_open, upper_open)| {
            let mut range = match (lower, upper) {
                (Some(lower), Some(upper)) => KeyRange::bound(lower, upper),
                (Some(lower), None) => KeyRange::at_least(lower),
                (None, Some(upper)) => KeyRange::at_most(upper),
                (None, None) => KeyRange::all(),
            };
            if lower_open {
                range = range.lower_open();
            }
            if upper_open {
                range = range.upper_open();
            }
            range
        })
}

/// Strategy for generating small flat record values.
pub fn record_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        prop_oneof![
            any::<i32>().prop_map(Value::from),
            prop::string::string_regex("[a-z ]{0,16}")
                .expect("Invalid regex")
                .prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ],
        1..5,
    )
    .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<String, Value>>()))
}
