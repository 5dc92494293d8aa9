//! Metrics attached to assistant messages.
//!
//! The chat API has sent metrics in two shapes over time: a plain object of
//! `name -> value`, and an array whose first element is such an object. The
//! object form is the only one kept in memory; the array form is migrated
//! when a response is decoded.

use serde_json::{Map, Value};

/// Ordered `name -> value` facts.
pub type Metrics = Map<String, Value>;

/// Convert a wire metrics value into the canonical shape.
///
/// Returns `None` when nothing usable remains (empty object, empty array,
/// array whose first element is not an object or holds only nulls).
pub fn migrate_metrics(value: Value) -> Option<Metrics> {
    let metrics = match value {
        Value::Object(map) => map,
        Value::Array(items) => {
            let Some(Value::Object(first)) = items.into_iter().next() else {
                return None;
            };
            first.into_iter().filter(|(_, v)| !v.is_null()).collect()
        }
        _ => return None,
    };

    (!metrics.is_empty()).then_some(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_shape_passes_through() {
        let m = migrate_metrics(json!({"totalMembers": 10, "avg": null})).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m["totalMembers"], json!(10));
    }

    #[test]
    fn legacy_array_uses_first_element_and_drops_nulls() {
        let m = migrate_metrics(json!([
            {"total_spend": "$10", "points": null},
            {"ignored": 1}
        ]))
        .unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m["total_spend"], json!("$10"));
    }

    #[test]
    fn empty_shapes_are_none() {
        assert!(migrate_metrics(json!({})).is_none());
        assert!(migrate_metrics(json!([])).is_none());
        assert!(migrate_metrics(json!([{"a": null}])).is_none());
        assert!(migrate_metrics(json!("text")).is_none());
    }

    #[test]
    fn key_order_is_preserved() {
        let m = migrate_metrics(json!({"zeta": 1, "alpha": 2})).unwrap();
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
