//! Shallow property merging.
//!
//! Later sources override earlier ones key by key. Used for node props,
//! override tables and front matter.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Merge an ordered sequence of maps. For each key the value from the last
/// map that defines it wins. No sources yields an empty map.
pub fn merge_all<'a, K, V, I>(sources: I) -> BTreeMap<K, V>
where
    I: IntoIterator<Item = &'a BTreeMap<K, V>>,
    K: Ord + Clone + 'a,
    V: Clone + 'a,
{
    let mut merged = BTreeMap::new();
    for source in sources {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Merge `overlay` on top of `base`.
pub fn merge_two<K, V>(base: &BTreeMap<K, V>, overlay: &BTreeMap<K, V>) -> BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    merge_all([base, overlay])
}

/// Merge JSON objects in order. Sources that are not objects are skipped.
pub fn merge_json_objects<'a, I>(sources: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut merged = Map::new();
    for source in sources {
        let Value::Object(object) = source else {
            tracing::debug!(kind = value_kind(source), "skipping non-object merge source");
            continue;
        };
        for (key, value) in object {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn later_sources_win() {
        let a = map(&[("x", 1), ("y", 1)]);
        let b = map(&[("y", 2), ("z", 2)]);
        let merged = merge_all([&a, &b]);
        assert_eq!(merged, map(&[("x", 1), ("y", 2), ("z", 2)]));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let merged = merge_all(std::iter::empty::<&BTreeMap<String, i64>>());
        assert!(merged.is_empty());
    }

    #[test]
    fn merging_is_associative_in_effect() {
        let a = map(&[("k", 1), ("a", 1)]);
        let b = map(&[("k", 2), ("b", 2)]);
        let c = map(&[("k", 3), ("a", 3)]);

        let flat = merge_all([&a, &b, &c]);
        let ab = merge_all([&a, &b]);
        let nested = merge_all([&ab, &c]);
        let bc = merge_all([&b, &c]);
        let right = merge_all([&a, &bc]);

        assert_eq!(flat, nested);
        assert_eq!(flat, right);
    }

    #[test]
    fn merge_two_overlays() {
        let base = map(&[("a", 1)]);
        let overlay = map(&[("a", 9)]);
        assert_eq!(merge_two(&base, &overlay)["a"], 9);
        // Inputs untouched.
        assert_eq!(base["a"], 1);
    }

    #[test]
    fn json_merge_skips_non_objects() {
        let sources = [
            json!({"title": "One", "draft": true}),
            json!("not a map"),
            json!({"title": "Two"}),
            json!(null),
        ];
        let merged = merge_json_objects(sources.iter());
        assert_eq!(merged["title"], json!("Two"));
        assert_eq!(merged["draft"], json!(true));
        assert_eq!(merged.len(), 2);
    }
}
