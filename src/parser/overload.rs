// ABOUTME: Deep merge of raw job documents used by overload inheritance
// ABOUTME: Child fields override base leaves and recurse into nested objects, keeping key order

use serde_json::{Map, Value};

/// Keys of an overloading job that never override the base.
pub const INHERITANCE_KEYS: [&str; 2] = ["type", "overload"];

/// Merge a child's declared fields over its base. The base's `type` and
/// `overload` are kept so the result can be re-examined for further links.
pub fn merge_job(base: &Value, child: &Value) -> Value {
    let mut merged = base.clone();
    match (&mut merged, child) {
        (Value::Object(target), Value::Object(overrides)) => {
            for (key, value) in overrides {
                if INHERITANCE_KEYS.contains(&key.as_str()) {
                    continue;
                }
                merge_entry(target, key, value);
            }
        }
        (merged, child) => *merged = child.clone(),
    }
    merged
}

/// Recursively merge `source` into `target`; non-object values replace.
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                merge_entry(target, key, value);
            }
        }
        (target, source) => *target = source.clone(),
    }
}

fn merge_entry(target: &mut Map<String, Value>, key: &str, value: &Value) {
    match target.get_mut(key) {
        Some(existing) => deep_merge(existing, value),
        None => {
            target.insert(key.to_string(), value.clone());
        }
    }
}
