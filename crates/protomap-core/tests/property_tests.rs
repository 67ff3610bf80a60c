//! Property-based tests for the conversion engine
//!
//! These tests verify invariants that should hold for all inputs: purity of
//! application, enforcement of required fields and constraints, nested-path
//! writes, agent priority, and the rename-only reverse round trip.


use proptest::prelude::*;
use protomap_core::translation::{derive_entries, reverse_table};
use protomap_core::{
    AgentDispatcher, AgentConfig, AgentKind, ApplyOptions, Constraint, Error, FieldMappingApplier,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use test_support::inline_table;

/// Strategy for generating leaf JSON values
fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
    ]
}

/// Strategy for generating chat messages
fn message_strategy() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("system"), Just("developer"), Just("user"), Just("assistant")],
        "[a-zA-Z0-9 .,!?]{0,80}",
    )
        .prop_map(|(role, content)| json!({"role": role, "content": content}))
}

/// Strategy for generating chat requests, some of which violate the bundled table
fn request_strategy() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("gpt-4"), Just("gpt-4o"), Just("custom-model"), Just("")],
        prop::collection::vec(message_strategy(), 0..5),
        prop::option::of(-1.0f64..3.0),
        prop::option::of(0u32..4096),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(model, messages, temperature, max_tokens, stream)| {
            let mut request = json!({"model": model, "messages": messages});
            if let Some(t) = temperature {
                request["temperature"] = json!(t);
            }
            if let Some(m) = max_tokens {
                request["max_tokens"] = json!(m);
            }
            if let Some(s) = stream {
                request["stream"] = json!(s);
            }
            request
        })
}

/// Distinct top-level field names that never collide with forbidden names
fn field_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 1..max).prop_map(|set: BTreeSet<String>| set.into_iter().collect())
}

fn bundled_dashscope() -> protomap_core::MappingTable {
    let text = protomap_core::translation::BUILTIN_TABLES
        .iter()
        .find(|(name, _)| *name == "openai-dashscope")
        .map(|(_, text)| *text)
        .unwrap();
    protomap_core::MappingTable::from_json_str("openai-dashscope", text).unwrap()
}

fn outcome(result: protomap_core::Result<Value>) -> Result<Value, String> {
    result.map_err(|e| e.to_string())
}

proptest! {
    #[test]
    fn prop_apply_is_pure(request in request_strategy()) {
        let table = bundled_dashscope();
        let applier = FieldMappingApplier::new(&table);
        let options = ApplyOptions::default();

        let first = outcome(applier.apply(&request, &options));
        let second = outcome(applier.apply(&request, &options));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_required_field_enforced(names in field_names(6), values in prop::collection::vec(leaf_strategy(), 6)) {
        let required = &names[0];
        let mut mappings = Map::new();
        for name in &names {
            mappings.insert(
                name.clone(),
                json!({"targetField": format!("out.{}", name), "required": name == required}),
            );
        }
        let table = inline_table(json!({"fieldMappings": mappings}));

        let input: Map<String, Value> = names
            .iter()
            .skip(1)
            .cloned()
            .zip(values.into_iter())
            .collect();
        let err = FieldMappingApplier::new(&table)
            .apply(&Value::Object(input), &ApplyOptions::default())
            .unwrap_err();
        let is_required_missing = matches!(err, Error::RequiredFieldMissing { ref field } if field == required);
        prop_assert!(is_required_missing);
    }

    #[test]
    fn prop_range_constraint_enforced(value in -10.0f64..10.0) {
        let table = inline_table(json!({
            "fieldMappings": {
                "temperature": {
                    "targetField": "parameters.temperature",
                    "validation": {"min": 0, "max": 2}
                }
            }
        }));
        let result = FieldMappingApplier::new(&table)
            .apply(&json!({"temperature": value}), &ApplyOptions::default());

        if (0.0..=2.0).contains(&value) {
            prop_assert_eq!(result.unwrap(), json!({"parameters": {"temperature": value}}));
        } else {
            let err = result.unwrap_err();
            let expected = if value < 0.0 { Constraint::Min } else { Constraint::Max };
            prop_assert_eq!(err.field(), Some("temperature"));
            prop_assert_eq!(err.constraint(), Some(&expected));
        }
    }

    #[test]
    fn prop_nested_paths_keep_siblings(names in field_names(8), values in prop::collection::vec(leaf_strategy(), 8)) {
        let mut mappings = Map::new();
        for name in &names {
            mappings.insert(name.clone(), json!(format!("input.{}", name)));
        }
        let table = inline_table(json!({"fieldMappings": mappings}));
        let input: Map<String, Value> = names.iter().cloned().zip(values.into_iter()).collect();

        let out = FieldMappingApplier::new(&table)
            .apply(&Value::Object(input.clone()), &ApplyOptions::default())
            .unwrap();
        prop_assert_eq!(out, json!({"input": input}));
    }

    #[test]
    fn prop_image_outranks_tools(text in "[a-z ]{0,40}", tool_count in 1usize..4) {
        let tools: Vec<Value> = (0..tool_count)
            .map(|i| json!({"type": "function", "function": {"name": format!("tool_{}", i)}}))
            .collect();
        let request = json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": text},
                    {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}}
                ]
            }],
            "tools": tools
        });
        let dispatcher = AgentDispatcher::from_config(&AgentConfig::default());
        prop_assert_eq!(dispatcher.select(&request), AgentKind::Image);
    }

    #[test]
    fn prop_rename_only_round_trip(names in field_names(10), values in prop::collection::vec(leaf_strategy(), 10)) {
        let mut mappings = Map::new();
        for (i, name) in names.iter().enumerate() {
            mappings.insert(name.clone(), json!(format!("group{}.{}", i % 3, name)));
        }
        let table = inline_table(json!({"fieldMappings": mappings}));
        let (_, warnings) = derive_entries(table.entries());
        prop_assert!(warnings.is_empty());

        let reverse = reverse_table(&table, true).unwrap();
        prop_assert!(reverse.derived);

        let input = Value::Object(names.iter().cloned().zip(values.into_iter()).collect());
        let options = ApplyOptions::default();
        let forward = FieldMappingApplier::new(&table).apply(&input, &options).unwrap();
        let restored = FieldMappingApplier::new(&reverse.table).apply(&forward, &options).unwrap();
        prop_assert_eq!(restored, input);
    }
}
