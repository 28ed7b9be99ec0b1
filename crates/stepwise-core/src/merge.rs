//! Additive payload merging for step data.

use serde_json::{Map, Value};

/// Overlay `incoming` onto `target`.
///
/// Objects merge key-by-key (recursively), arrays append the elements they
/// don't already hold, and anything else overwrites. `null` never erases an
/// existing value.
pub fn merge_data(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (_, Value::Null) => {}
        (Value::Object(current), Value::Object(next)) => merge_data(current, next),
        (Value::Array(current), Value::Array(next)) => append_unique(current, next),
        (slot, next) => *slot = next,
    }
}

/// Append elements of `incoming` that are not already present.
pub fn append_unique(target: &mut Vec<Value>, incoming: impl IntoIterator<Item = Value>) {
    for item in incoming {
        if !target.iter().any(|held| same_element(held, &item)) {
            target.push(item);
        }
    }
}

/// Elements carrying a `url` are identified by it; everything else by value.
fn same_element(a: &Value, b: &Value) -> bool {
    match (url_of(a), url_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn url_of(value: &Value) -> Option<&str> {
    value.get("url").and_then(Value::as_str)
}
