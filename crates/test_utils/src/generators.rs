//! Property-based test generators
//!
//! Proptest strategies for sequences, object types, payloads and update
//! records.

use proptest::collection::{btree_map, hash_set, vec};
use proptest::prelude::*;
use serde_json::{Map, Value};

use domain_update::{Update, UpdateState};

use crate::builders::UpdateBuilder;

/// Any sequence number, including ones past the `i64` range
pub fn sequence_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        3 => 1u64..1_000,
        1 => any::<u64>(),
    ]
}

/// `count` distinct sequence numbers, in generation order
pub fn distinct_sequences_strategy(
    count: std::ops::Range<usize>,
) -> impl Strategy<Value = Vec<u64>> {
    hash_set(1u64..100_000, count).prop_map(|set| set.into_iter().collect())
}

/// LX1 object type codes
pub fn object_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("FOUR".to_string()),
        Just("INVENT".to_string()),
        Just("ART".to_string()),
        "[A-Z]{2,8}",
    ]
}

pub fn update_state_strategy() -> impl Strategy<Value = UpdateState> {
    prop_oneof![
        Just(UpdateState::ToExecute),
        Just(UpdateState::Executed),
        Just(UpdateState::Failed),
    ]
}

/// JSON payloads built from integers, strings, booleans and nulls
///
/// Floats are left out so that equality after a store round trip is exact.
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 éèàçÉ/_-]{0,16}".prop_map(Value::String),
    ];

    let node = leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..6).prop_map(Value::Array),
            btree_map("[A-Z_]{1,10}", inner, 0..6)
                .prop_map(|fields| {
                    Value::Object(fields.into_iter().collect::<Map<String, Value>>())
                }),
        ]
    });

    btree_map("[A-Z_]{1,10}", node, 1..6)
        .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<String, Value>>()))
}

/// A pending update with arbitrary sequence, object type and payload
pub fn update_strategy() -> impl Strategy<Value = Update> {
    (sequence_strategy(), object_type_strategy(), payload_strategy(), 1i32..10_000).prop_map(
        |(sequence, object_type, payload, node_number)| {
            UpdateBuilder::new()
                .with_sequence(sequence)
                .with_object_type(object_type)
                .with_payload(payload)
                .with_node_number(node_number)
                .build()
        },
    )
}
