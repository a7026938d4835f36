//! Data dictionary utilities
//!
//! Helpers for understanding the shape of retrieved records before writing a
//! proper model for them:
//!
//! - [`list_to_dict`] - index an array by 1-based position
//! - [`compare_keys`] - recursively report keys missing from a record
//! - [`type_tree`] / [`stringify`] - rebuild a record with transformed leaves
//! - [`schema_jsonify`] - turn a type tree into a JSON Schema
//!
//! # Example
//!
//! ```rust
//! use datopy_core::modeling::{schema_jsonify, type_tree};
//! use serde_json::json;
//!
//! let record = json!({"type": "album", "audio_features": [{"loudness": -11.4}]});
//! let tree = type_tree(&record);
//! assert_eq!(tree, json!({"type": "str", "audio_features": {"1": {"loudness": "float"}}}));
//!
//! let schema = schema_jsonify(&tree);
//! assert_eq!(schema["properties"]["audio_features"]["type"], "array");
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Maximum number of array elements sampled when rebuilding a tree
pub const ARRAY_SAMPLE_LIMIT: usize = 5;

const MISSING_NESTED: &str = "missing nested dictionary";

/// Index an array by 1-based position.
///
/// Objects and scalars are returned unchanged. With `max_items`, only the
/// leading elements are kept.
pub fn list_to_dict(value: &Value, max_items: Option<usize>) -> Value {
    match value {
        Value::Array(items) => {
            let limit = max_items.unwrap_or(items.len());
            Value::Object(index_items(items.iter().take(limit).cloned()))
        }
        Value::Object(_) => {
            tracing::debug!("not running conversion since value is already an object");
            value.clone()
        }
        other => other.clone(),
    }
}

fn index_items(items: impl Iterator<Item = Value>) -> Map<String, Value> {
    items
        .enumerate()
        .map(|(ix, item)| ((ix + 1).to_string(), item))
        .collect()
}

/// Keys missing from a candidate record relative to a reference record
#[derive(Debug, Clone, PartialEq)]
pub enum KeyDiff {
    /// The reference holds an object where the candidate does not
    MissingNested,

    /// Missing keys at this level and differences below it
    Keys {
        /// Reference keys absent from the candidate, in reference order
        missing_keys: Vec<String>,
        /// Non-empty differences of shared keys, in reference order
        nested_diff: Vec<(String, KeyDiff)>,
    },
}

impl KeyDiff {
    /// Look up the nested difference for a shared key
    pub fn nested(&self, key: &str) -> Option<&KeyDiff> {
        match self {
            Self::MissingNested => None,
            Self::Keys { nested_diff, .. } => {
                nested_diff.iter().find(|(k, _)| k == key).map(|(_, d)| d)
            }
        }
    }

    /// Missing keys at this level
    pub fn missing_keys(&self) -> &[String] {
        match self {
            Self::MissingNested => &[],
            Self::Keys { missing_keys, .. } => missing_keys,
        }
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        // Serializing into a Value cannot fail for this shape
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for KeyDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::MissingNested => serializer.serialize_str(MISSING_NESTED),
            Self::Keys {
                missing_keys,
                nested_diff,
            } => {
                let len =
                    usize::from(!missing_keys.is_empty()) + usize::from(!nested_diff.is_empty());
                let mut map = serializer.serialize_map(Some(len))?;
                if !missing_keys.is_empty() {
                    map.serialize_entry("missing_keys", missing_keys)?;
                }
                if !nested_diff.is_empty() {
                    map.serialize_entry("nested_diff", &NestedDiff(nested_diff))?;
                }
                map.end()
            }
        }
    }
}

struct NestedDiff<'a>(&'a [(String, KeyDiff)]);

impl Serialize for NestedDiff<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Recursively compare two records and identify keys missing from `candidate`.
///
/// Returns `None` when nothing is missing at any depth.
pub fn compare_keys(reference: &Value, candidate: &Value) -> Option<KeyDiff> {
    let reference = reference.as_object()?;
    let Some(candidate) = candidate.as_object() else {
        return Some(KeyDiff::MissingNested);
    };

    let mut missing_keys = Vec::new();
    let mut nested_diff = Vec::new();

    for (key, ref_value) in reference {
        match candidate.get(key) {
            None => missing_keys.push(key.clone()),
            Some(cand_value) => {
                if let Some(diff) = compare_keys(ref_value, cand_value) {
                    nested_diff.push((key.clone(), diff));
                }
            }
        }
    }

    if missing_keys.is_empty() && nested_diff.is_empty() {
        None
    } else {
        Some(KeyDiff::Keys {
            missing_keys,
            nested_diff,
        })
    }
}

/// Rebuild a record as a tree of objects, applying `f` to every leaf.
///
/// Arrays become 1-based keyed objects sampled to [`ARRAY_SAMPLE_LIMIT`]
/// elements.
pub fn apply_recursive<F>(value: &Value, f: &F) -> Value
where
    F: Fn(&Value) -> Value,
{
    apply_recursive_with_limit(value, f, ARRAY_SAMPLE_LIMIT)
}

/// [`apply_recursive`] with an explicit array sample limit
pub fn apply_recursive_with_limit<F>(value: &Value, f: &F, limit: usize) -> Value
where
    F: Fn(&Value) -> Value,
{
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), apply_recursive_with_limit(v, f, limit)))
                .collect(),
        ),
        Value::Array(items) => Value::Object(index_items(
            items
                .iter()
                .take(limit)
                .map(|v| apply_recursive_with_limit(v, f, limit)),
        )),
        leaf => f(leaf),
    }
}

/// Short type name of a leaf value
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "str",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field/type pairs for a record
pub fn type_tree(value: &Value) -> Value {
    type_tree_with_limit(value, ARRAY_SAMPLE_LIMIT)
}

/// [`type_tree`] with an explicit array sample limit
pub fn type_tree_with_limit(value: &Value, limit: usize) -> Value {
    apply_recursive_with_limit(value, &|leaf| Value::from(type_name(leaf)), limit)
}

/// Field/value pairs with every leaf rendered as a string
pub fn stringify(value: &Value) -> Value {
    apply_recursive(value, &|leaf| match leaf {
        Value::String(_) => leaf.clone(),
        other => Value::String(other.to_string()),
    })
}

/// Convert a type tree into a JSON Schema.
///
/// Every object field is required so the result can be loosened by hand.
/// Indexed objects become arrays whose item schema is taken from the first
/// element.
pub fn schema_jsonify(tree: &Value) -> Value {
    match tree {
        Value::Object(map) if !map.is_empty() => {
            let indexed = map.keys().next().is_some_and(|k| k.parse::<u64>().is_ok());
            if indexed {
                let max_items = map
                    .keys()
                    .last()
                    .and_then(|k| k.parse::<u64>().ok())
                    .unwrap_or(map.len() as u64);
                let first = map
                    .get("1")
                    .or_else(|| map.values().next())
                    .unwrap_or(&Value::Null);
                json!({
                    "type": "array",
                    "minItems": 1,
                    "maxItems": max_items,
                    "uniqueItems": true,
                    "items": schema_jsonify(first),
                })
            } else {
                let properties: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), schema_jsonify(v)))
                    .collect();
                let required: Vec<&String> = map.keys().collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
        }
        Value::String(name) => match name.as_str() {
            "str" => json!({"type": "string"}),
            "int" | "float" => json!({"type": "number"}),
            "bool" => json!({"type": "boolean"}),
            _ => json!({"type": "null"}),
        },
        _ => json!({"type": "null"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested_reference() -> Value {
        json!({
            "a1": 1, "a2": "two", "a3": [3],
            "b1": {"b11": 1, "b12": "two", "b13": [3]},
            "c1": {"c11": {"c111": 1, "c112": "two", "c113": [3]}}
        })
    }

    #[test]
    fn test_list_to_dict_indexes_from_one() {
        let value = json!([1, "two", [3], {"four": 5}]);
        let result = list_to_dict(&value, None);
        assert_eq!(result, json!({"1": 1, "2": "two", "3": [3], "4": {"four": 5}}));
    }

    #[test]
    fn test_list_to_dict_respects_max_items() {
        let value = json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let result = list_to_dict(&value, Some(5));
        assert_eq!(result, json!({"1": 1, "2": 2, "3": 3, "4": 4, "5": 5}));
    }

    #[test]
    fn test_list_to_dict_passes_objects_through() {
        let value = json!({"a": 1, "b": "two"});
        assert_eq!(list_to_dict(&value, None), value);
    }

    #[test]
    fn test_compare_identical_records() {
        let reference = nested_reference();
        assert!(compare_keys(&reference, &reference.clone()).is_none());
    }

    #[test]
    fn test_compare_missing_top_level_key() {
        let reference = nested_reference();
        let mut candidate = reference.clone();
        candidate.as_object_mut().unwrap().remove("a1");

        let diff = compare_keys(&reference, &candidate).unwrap();
        assert_eq!(diff.to_value(), json!({"missing_keys": ["a1"]}));
    }

    #[test]
    fn test_compare_missing_nested_key() {
        let reference = nested_reference();
        let mut candidate = reference.clone();
        candidate["b1"].as_object_mut().unwrap().remove("b12");

        let diff = compare_keys(&reference, &candidate).unwrap();
        assert_eq!(
            diff.to_value(),
            json!({"nested_diff": {"b1": {"missing_keys": ["b12"]}}})
        );
    }

    #[test]
    fn test_compare_missing_deeply_nested_key() {
        let reference = nested_reference();
        let mut candidate = reference.clone();
        candidate["c1"]["c11"].as_object_mut().unwrap().remove("c113");

        let diff = compare_keys(&reference, &candidate).unwrap();
        assert_eq!(
            diff.to_value(),
            json!({"nested_diff": {"c1": {"nested_diff": {"c11": {"missing_keys": ["c113"]}}}}})
        );
        assert_eq!(
            diff.nested("c1").and_then(|d| d.nested("c11")).unwrap().missing_keys(),
            ["c113".to_string()]
        );
    }

    #[test]
    fn test_compare_replaced_object() {
        let reference = nested_reference();
        let mut candidate = reference.clone();
        candidate["b1"] = json!("flattened");

        let diff = compare_keys(&reference, &candidate).unwrap();
        assert_eq!(
            diff.to_value(),
            json!({"nested_diff": {"b1": "missing nested dictionary"}})
        );
    }

    #[test]
    fn test_compare_scalars_yields_nothing() {
        assert!(compare_keys(&json!(1), &json!({"a": 1})).is_none());
    }

    #[test]
    fn test_stringify_indexes_arrays() {
        let record = json!({"type": "album", "url": "link.com", "audio_features": [
            {"loudness": -11.4, "duration_ms": 251},
            {"loudness": -15.5, "duration_ms": 284}]});
        let result = stringify(&record);
        assert_eq!(
            result,
            json!({"type": "album", "url": "link.com", "audio_features": {
                "1": {"loudness": "-11.4", "duration_ms": "251"},
                "2": {"loudness": "-15.5", "duration_ms": "284"}}})
        );
    }

    #[test]
    fn test_type_tree_names_leaves() {
        let record = json!({"name": "x", "count": 3, "ratio": 0.5, "flag": true, "gone": null});
        assert_eq!(
            type_tree(&record),
            json!({"name": "str", "count": "int", "ratio": "float", "flag": "bool", "gone": "null"})
        );
    }

    #[test]
    fn test_type_tree_samples_long_arrays() {
        let record = json!({"values": [1, 2, 3, 4, 5, 6, 7]});
        let tree = type_tree(&record);
        assert_eq!(tree["values"].as_object().unwrap().len(), ARRAY_SAMPLE_LIMIT);
    }

    #[test]
    fn test_schema_jsonify_nested() {
        let tree = json!({
            "name": "str", "quantity": "int",
            "features": {"1": {"volume": "str", "duration": "float"}, "2": {"volume": "str", "duration": "float"}},
            "creator": {"person": {"name": "str"}, "company": {"name": "str", "location": "str"}}
        });
        let schema = schema_jsonify(&tree);

        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["required"],
            json!(["name", "quantity", "features", "creator"])
        );
        assert_eq!(schema["properties"]["name"], json!({"type": "string"}));
        assert_eq!(schema["properties"]["quantity"], json!({"type": "number"}));

        let features = &schema["properties"]["features"];
        assert_eq!(features["type"], "array");
        assert_eq!(features["minItems"], 1);
        assert_eq!(features["maxItems"], 2);
        assert_eq!(features["uniqueItems"], true);
        assert_eq!(features["items"]["required"], json!(["volume", "duration"]));

        assert_eq!(
            schema["properties"]["creator"]["required"],
            json!(["person", "company"])
        );
    }

    #[test]
    fn test_schema_jsonify_empty_object_is_null() {
        assert_eq!(schema_jsonify(&json!({})), json!({"type": "null"}));
        assert_eq!(schema_jsonify(&json!("null")), json!({"type": "null"}));
        assert_eq!(schema_jsonify(&json!("bool")), json!({"type": "boolean"}));
    }
}
