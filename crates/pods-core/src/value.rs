//! Loosely typed option values.
//!
//! Options and meta arrive from the host as JSON-like values whose shapes are
//! not always consistent (`"1"` vs `1` vs `true`). These helpers coerce them.

use serde_json::{Map, Value};

/// An option mapping (key → value).
pub type Options = Map<String, Value>;

/// Legacy host column names accepted in place of definition keys.
pub const DEPRECATED_KEYS: &[(&str, &str)] = &[
    ("ID", "id"),
    ("post_title", "label"),
    ("post_name", "name"),
    ("post_content", "description"),
    ("post_parent", "parent_id"),
];

/// Map a deprecated key to its current name, or return the key unchanged.
pub fn canonical_key(key: &str) -> &str {
    DEPRECATED_KEYS
        .iter()
        .find(|(old, _)| *old == key)
        .map(|(_, new)| *new)
        .unwrap_or(key)
}

/// Rewrite every deprecated key in an option map.
///
/// When both a deprecated key and its replacement are present, the
/// replacement wins.
pub fn normalize_keys(options: Options) -> Options {
    let mut normalized = Options::new();
    let mut deprecated = Vec::new();

    for (key, value) in options {
        let canonical = canonical_key(&key);
        if canonical == key {
            normalized.insert(key, value);
        } else {
            deprecated.push((canonical.to_string(), value));
        }
    }

    for (key, value) in deprecated {
        normalized.entry(key).or_insert(value);
    }

    normalized
}

/// Coerce a value to an unsigned id.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().filter(|v| *v >= 0).map(|v| v as u64))
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

/// Coerce a value to a string. Null becomes empty.
pub fn as_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Coerce a value to a boolean using host truthiness.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether a value counts as empty in the host's sense.
pub fn is_empty(value: &Value) -> bool {
    !as_bool(value)
}

/// Collect ids from a value that may be a list, a single id, or a
/// comma separated string.
pub fn as_id_list(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_u64).collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect(),
        other => as_u64(other).into_iter().filter(|id| *id > 0).collect(),
    }
}
