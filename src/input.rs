//! Untrusted request input.
//!
//! An [`InputMap`] is whatever a client submitted: arbitrary keys, arbitrary
//! values. Keys stay raw strings; only the engine decides which of them name a
//! writable field.

use serde::Serialize;

use crate::error::ValidationError;
use crate::value::Value;

/// Supplies the submitted key/value payload of the active request.
pub trait InputSource {
    /// The full payload. Read-only; called once per create or update.
    fn current_input(&self) -> InputMap;
}

/// One request's submitted data, in submission order.
///
/// A repeated key keeps its position and takes the last value, the way form
/// decoders usually resolve duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputMap {
    entries: Vec<(String, Value)>,
}

impl InputMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, overwriting an earlier submission of `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Builder-style [`InputMap::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builds a map from decoded form pairs. Every value is a string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.insert(k, Value::String(v.into()));
        }
        map
    }

    /// Builds a map from a JSON object body.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, ValidationError> {
        let serde_json::Value::Object(object) = body else {
            return Err(ValidationError::InputNotAnObject {
                actual: json_kind(body),
            });
        };
        let mut map = Self::new();
        for (k, v) in object {
            map.insert(k.clone(), Value::from_json(v));
        }
        Ok(map)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl InputSource for InputMap {
    fn current_input(&self) -> InputMap {
        self.clone()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for InputMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_overwrites_and_keeps_position() {
        let map = InputMap::new()
            .with("a", 1)
            .with("b", 2)
            .with("a", 3);
        let entries: Vec<(&str, &Value)> = map.iter().collect();
        assert_eq!(entries, vec![("a", &Value::Int(3)), ("b", &Value::Int(2))]);
    }

    #[test]
    fn from_pairs_stores_strings() {
        let map = InputMap::from_pairs([("email", "a@b.com"), ("age", "41")]);
        assert_eq!(map.get("age"), Some(&Value::from("41")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn from_json_object() {
        let map = InputMap::from_json(&json!({"email": "a@b.com", "admin": true})).unwrap();
        assert_eq!(map.get("email"), Some(&Value::from("a@b.com")));
        assert_eq!(map.get("admin"), Some(&Value::Bool(true)));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = InputMap::from_json(&json!(["email"])).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InputNotAnObject { actual: "array" }
        ));
    }

    #[test]
    fn keys_are_not_validated() {
        let map = InputMap::new().with("not a field; --", "x");
        assert_eq!(map.get("not a field; --"), Some(&Value::from("x")));
    }

    #[test]
    fn input_map_is_its_own_source() {
        let map = InputMap::new().with("k", "v");
        let source: &dyn InputSource = &map;
        assert_eq!(source.current_input(), map);
    }
}
