//! Lenient JSON accessors for Bedrock bodies.

use serde_json::{Map, Value};

/// String at a JSON pointer
pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Counter at a JSON pointer; missing or negative values read as zero
pub(crate) fn u64_at(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

/// Float vector at a JSON pointer; non-numeric entries are dropped
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn f32_vec_at(value: &Value, pointer: &str) -> Vec<f32> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_f64)
                .map(|x| x as f32)
                .collect()
        })
        .unwrap_or_default()
}

/// Insert `value` under `key` only when present
pub(crate) fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}
