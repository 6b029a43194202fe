//! Canonical JSON serialization for deterministic hashing
//!
//! Object keys are sorted recursively and output is compact, so the same
//! fitted pipeline always produces the same bytes and the same BLAKE3 hash.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Serialize a value to canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json_value = serde_json::to_value(value)?;
    serde_json::to_string(&canonicalize_value(json_value))
}

/// Canonicalize a JSON value by sorting all object keys recursively
fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize_value(v)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

/// BLAKE3 hash of raw bytes as lowercase hex
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// BLAKE3 hash of a value's canonical JSON as lowercase hex
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(hash_bytes_hex(to_canonical_json(value)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestStruct {
        b_field: i64,
        a_field: f64,
        z_field: String,
    }

    fn sample() -> TestStruct {
        TestStruct {
            b_field: 2,
            a_field: 0.1,
            z_field: "test".to_string(),
        }
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = to_canonical_json(&sample()).unwrap();

        let a_pos = json.find("a_field").unwrap();
        let b_pos = json.find("b_field").unwrap();
        let z_pos = json.find("z_field").unwrap();
        assert!(a_pos < b_pos);
        assert!(b_pos < z_pos);
        assert!(!json.contains('\n'));
        assert!(!json.contains(' '));
    }

    #[test]
    fn test_nested_objects_sorted() {
        let value = serde_json::json!({ "outer_b": { "z": 1, "a": 2 }, "outer_a": [ { "y": 1, "b": 2 } ] });
        let json = to_canonical_json(&value).unwrap();
        assert_eq!(json, r#"{"outer_a":[{"b":2,"y":1}],"outer_b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn test_hash_deterministic() {
        let hash1 = hash_canonical_hex(&sample()).unwrap();
        let hash2 = hash_canonical_hex(&sample()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_data() {
        let mut other = sample();
        other.b_field = 3;
        assert_ne!(
            hash_canonical_hex(&sample()).unwrap(),
            hash_canonical_hex(&other).unwrap()
        );
    }
}
