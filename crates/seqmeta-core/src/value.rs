//! Document value model.
//!
//! [`JsonValue`] is a closed sum over the six JSON types. Objects are stored
//! in a [`BTreeMap`], so equality is structural and ignores the order in
//! which keys were inserted. Numbers keep the literal text they were parsed
//! from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Object entries keyed by member name.
pub type Map = BTreeMap<String, JsonValue>;

/// A parsed JSON document.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    /// `null`
    #[default]
    Null,
    /// `true` / `false`
    Bool(bool),
    /// A number, carried exactly as parsed
    Number(serde_json::Number),
    /// A unicode string
    String(String),
    /// An ordered sequence
    Array(Vec<JsonValue>),
    /// A keyed mapping with unique keys
    Object(Map),
}

impl JsonValue {
    /// An empty object, `{}`.
    #[must_use]
    pub fn object() -> Self {
        JsonValue::Object(Map::new())
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Returns `true` for objects.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    /// Object entries, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            JsonValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Array items, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// String contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<&serde_json::Number> {
        match self {
            JsonValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Member lookup; `None` for missing keys and for non-objects.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|entries| entries.get(key))
    }

    /// JSON type name, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            serde_json::Value::Object(entries) => JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(b),
            JsonValue::Number(n) => serde_json::Value::Number(n),
            JsonValue::String(s) => serde_json::Value::String(s),
            JsonValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            JsonValue::Object(entries) => serde_json::Value::Object(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::Bool(b)
    }
}

impl From<i64> for JsonValue {
    fn from(n: i64) -> Self {
        JsonValue::Number(n.into())
    }
}

impl From<u64> for JsonValue {
    fn from(n: u64) -> Self {
        JsonValue::Number(n.into())
    }
}

impl From<f64> for JsonValue {
    /// Non-finite values have no JSON representation and become `null`.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::String(s.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        JsonValue::String(s)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(items: Vec<JsonValue>) -> Self {
        JsonValue::Array(items)
    }
}

impl From<Map> for JsonValue {
    fn from(entries: Map) -> Self {
        JsonValue::Object(entries)
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for JsonValue {
    fn from_iter<I: IntoIterator<Item = (K, JsonValue)>>(iter: I) -> Self {
        JsonValue::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Number(n) => n.serialize(serializer),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(items) => serializer.collect_seq(items),
            JsonValue::Object(entries) => serializer.collect_map(entries),
        }
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(JsonValue::from)
    }
}

impl std::fmt::Display for JsonValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_equality_ignores_insertion_order() {
        let a: JsonValue = [("x", JsonValue::from(1_i64)), ("y", JsonValue::from(2_i64))]
            .into_iter()
            .collect();
        let b: JsonValue = [("y", JsonValue::from(2_i64)), ("x", JsonValue::from(1_i64))]
            .into_iter()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn object_equality_checks_keys_and_values() {
        let a = JsonValue::from(json!({"x": 1, "y": 2}));
        assert_ne!(a, JsonValue::from(json!({"x": 1})));
        assert_ne!(a, JsonValue::from(json!({"x": 1, "y": 3})));
        assert_ne!(a, JsonValue::from(json!({"x": 1, "z": 2})));
    }

    #[test]
    fn array_equality_is_ordered() {
        assert_ne!(
            JsonValue::from(json!([1, 2])),
            JsonValue::from(json!([2, 1]))
        );
    }

    #[test]
    fn accessors() {
        let doc = JsonValue::from(json!({
            "name": "S-001",
            "paired": true,
            "reads": [1, 2],
            "depth": 30,
            "note": null
        }));
        assert_eq!(doc.get("name").and_then(JsonValue::as_str), Some("S-001"));
        assert_eq!(doc.get("paired").and_then(JsonValue::as_bool), Some(true));
        assert_eq!(doc.get("reads").and_then(JsonValue::as_array).map(<[_]>::len), Some(2));
        assert_eq!(
            doc.get("depth").and_then(JsonValue::as_number).and_then(serde_json::Number::as_u64),
            Some(30)
        );
        assert!(doc.get("note").is_some_and(JsonValue::is_null));
        assert!(doc.get("missing").is_none());
        assert!(JsonValue::from("x").get("name").is_none());
        assert_eq!(doc.type_name(), "object");
    }

    #[test]
    fn serde_value_conversion_roundtrip() {
        let original = json!({"a": [1, "two", null, {"b": false}], "c": 1.5});
        let converted = JsonValue::from(original.clone());
        assert_eq!(serde_json::Value::from(converted), original);
    }

    #[test]
    fn non_finite_float_is_null() {
        assert!(JsonValue::from(f64::NAN).is_null());
        assert!(JsonValue::from(2.5_f64).as_number().is_some());
    }

    #[test]
    fn display_is_compact_json() {
        let doc = JsonValue::from(json!({"b": [1, 2], "a": "x"}));
        assert_eq!(doc.to_string(), r#"{"a":"x","b":[1,2]}"#);
    }
}
