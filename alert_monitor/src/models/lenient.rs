//! Deserializers that accept the loose shapes found in hand-edited or legacy
//! JSON: a value may be missing, `null`, a scalar, or a list of scalars.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalars(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.into_iter().flat_map(scalars).collect(),
        Value::Object(_) => Vec::new(),
    }
}

/// A single string; lists are joined with `", "`.
pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(scalars(Value::deserialize(d)?).join(", "))
}

/// A list of strings; a scalar becomes a one-element list.
pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(scalars(Value::deserialize(d)?))
}

/// The first string of a scalar-or-list value.
pub fn first<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(scalars(Value::deserialize(d)?)
        .into_iter()
        .next()
        .unwrap_or_default())
}
