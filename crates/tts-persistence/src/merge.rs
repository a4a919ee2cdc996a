//! Shallow merge of JSON objects.

use serde_json::Value;

/// A JSON object (string keys to values).
pub type JsonObject = serde_json::Map<String, Value>;

/// Merge `partial` over `current` one level deep.
///
/// Keys of `partial` replace keys of `current` wholesale; nested objects are
/// not merged recursively. A non-object `current` is treated as `{}`.
pub fn shallow_merge(current: &Value, partial: &JsonObject) -> Value {
    let mut merged = match current {
        Value::Object(map) => map.clone(),
        _ => JsonObject::new(),
    };
    for (key, value) in partial {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// Wrap a value as `{ "formData": value }`.
pub fn form_data_patch(form_data: JsonObject) -> JsonObject {
    let mut patch = JsonObject::new();
    patch.insert("formData".to_string(), Value::Object(form_data));
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_merge_replaces_top_level_keys() {
        let current = json!({"a": 1, "b": {"x": 1}});
        let partial = json!({"b": {"y": 2}, "c": null});
        let Value::Object(partial) = partial else {
            unreachable!()
        };

        assert_eq!(
            shallow_merge(&current, &partial),
            json!({"a": 1, "b": {"y": 2}, "c": null})
        );
    }

    #[test]
    fn test_merge_over_non_object() {
        let partial = form_data_patch(JsonObject::new());
        assert_eq!(shallow_merge(&json!([1, 2]), &partial), json!({"formData": {}}));
    }

    fn arb_object() -> impl Strategy<Value = JsonObject> {
        prop::collection::btree_map("[a-d]", any::<i32>(), 0..5).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(current in arb_object(), partial in arb_object()) {
            let once = shallow_merge(&Value::Object(current), &partial);
            let twice = shallow_merge(&once, &partial);
            prop_assert_eq!(once, twice);
        }
    }
}
