//! Merge-based config comparison.
//!
//! Core stores fields the reconciler never sets (assigned ports, runtime
//! defaults). A process is up to date when laying the desired document over
//! the observed one changes nothing, so those extra fields never count as
//! drift while any field the desired document does set must match.

use serde_json::Value;

/// Merge `head` over `base`.
///
/// Objects merge key by key, recursively; keys only in `base` survive.
/// Scalars and arrays are replaced by `head` as a whole.
pub fn deep_merge(base: &Value, head: &Value) -> Value {
    match (base, head) {
        (Value::Object(base_map), Value::Object(head_map)) => {
            let mut merged = base_map.clone();
            for (key, head_value) in head_map {
                let value = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, head_value),
                    None => head_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => head.clone(),
    }
}

/// Whether `observed` already contains everything `desired` specifies.
pub fn is_up_to_date(observed: &Value, desired: &Value) -> bool {
    deep_merge(observed, desired) == *observed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subset_is_up_to_date() {
        assert!(is_up_to_date(&json!({"a": 1, "b": 2}), &json!({"a": 1})));
    }

    #[test]
    fn test_changed_value_is_not_up_to_date() {
        let observed = json!({"a": 1, "b": 2});
        let desired = json!({"a": 3});

        assert_eq!(deep_merge(&observed, &desired), json!({"a": 3, "b": 2}));
        assert!(!is_up_to_date(&observed, &desired));
    }

    #[test]
    fn test_missing_key_is_not_up_to_date() {
        assert!(!is_up_to_date(&json!({"a": 1}), &json!({"a": 1, "c": 4})));
    }

    #[test]
    fn test_nested_extra_fields_are_ignored() {
        let observed = json!({
            "limits": {"cpu_usage": 0, "memory_mbytes": 0, "waitfor_seconds": 0},
            "output": [{"id": "0", "address": "{memfs}/a.m3u8"}],
            "runtime": {"port": 31000}
        });
        let desired = json!({
            "limits": {"cpu_usage": 0},
            "output": [{"id": "0", "address": "{memfs}/a.m3u8"}]
        });

        assert!(is_up_to_date(&observed, &desired));
    }

    #[test]
    fn test_arrays_are_compared_whole() {
        let observed = json!({"output": [{"id": "0", "address": "x", "cleanup": []}]});
        let desired = json!({"output": [{"id": "0", "address": "x"}]});

        assert_eq!(deep_merge(&observed, &desired), desired);
        assert!(!is_up_to_date(&observed, &desired));
    }

    #[test]
    fn test_array_length_change_is_drift() {
        let observed = json!({"options": ["-loglevel", "info", "-nostats"]});
        let desired = json!({"options": ["-loglevel", "info"]});

        assert!(!is_up_to_date(&observed, &desired));
    }

    #[test]
    fn test_array_element_change_is_drift() {
        let observed = json!({"input": [{"address": "rtsp://old"}]});
        let desired = json!({"input": [{"address": "rtsp://new"}]});

        assert!(!is_up_to_date(&observed, &desired));
    }

    #[test]
    fn test_type_change_replaces() {
        assert_eq!(deep_merge(&json!({"a": {"x": 1}}), &json!({"a": 5})), json!({"a": 5}));
        assert!(!is_up_to_date(&json!({"a": "1"}), &json!({"a": 1})));
    }
}
