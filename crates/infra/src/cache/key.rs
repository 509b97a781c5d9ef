//! Deterministic cache keys for query results.

use serde_json::Value;

/// Serialize `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// `query:{operation}:{blake3(canonical params)}`.
pub fn query_key(operation: &str, params: &Value) -> String {
    let digest = blake3::hash(canonical_json(params).as_bytes());
    format!("query:{operation}:{}", digest.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{Map, json};

    #[test]
    fn nested_objects_are_sorted() {
        let value = json!({"b": {"z": 1, "a": [ {"y": true, "x": null} ]}, "a": "s"});
        assert_eq!(canonical_json(&value), r#"{"a":"s","b":{"a":[{"x":null,"y":true}],"z":1}}"#);
    }

    #[test]
    fn operation_is_part_of_the_key() {
        let params = json!({"q": "rust"});
        assert_ne!(query_key("search.candidates", &params), query_key("pipeline.view", &params));
        assert!(query_key("search.candidates", &params).starts_with("query:search.candidates:"));
    }

    #[test]
    fn array_order_still_matters() {
        assert_ne!(query_key("op", &json!({"skills": ["a", "b"]})), query_key("op", &json!({"skills": ["b", "a"]})));
    }

    proptest! {
        #[test]
        fn key_ignores_insertion_order(pairs in proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..8)) {
            let forward: Map<String, Value> = pairs.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let backward: Map<String, Value> = pairs.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            prop_assert_eq!(
                query_key("search.candidates", &json!({"filters": forward})),
                query_key("search.candidates", &json!({"filters": backward}))
            );
        }
    }
}
