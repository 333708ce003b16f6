//! The per-execution variable environment.
//!
//! Keys are dot-addressable paths over a JSON object tree. Setting a nested
//! path creates intermediate objects; reading a missing path yields nothing.
//! The environment is serialized onto the execution record and survives for
//! the execution's lifetime, merged (not replaced) on every resume.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resolves a dot path inside a JSON value. Numeric segments index arrays.
#[must_use]
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Renders a JSON value the way it appears inside an interpolated string.
///
/// Strings render without quotes; null renders empty; everything else uses
/// its JSON form.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A mutable, dot-path-addressable map of conversation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableEnvironment {
    values: Map<String, Value>,
}

impl VariableEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a dot path. Missing segments or non-container intermediates
    /// yield `None`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (first, rest) = match path.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };
        let root = self.values.get(first)?;
        match rest {
            Some(rest) => lookup_path(root, rest),
            None => Some(root),
        }
    }

    /// The string rendering of a path, empty when missing.
    #[must_use]
    pub fn get_string(&self, path: &str) -> String {
        self.get(path).map(render_value).unwrap_or_default()
    }

    /// Sets a dot path, creating intermediate objects as needed. An
    /// intermediate that exists but is not an object is replaced by one.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return;
        };
        let segments: Vec<&str> = segments.collect();
        if segments.is_empty() {
            self.values.insert(first.to_string(), value);
            return;
        }

        let root = self
            .values
            .entry(first.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let mut current = root;
        for segment in &segments[..segments.len() - 1] {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .expect("just ensured object")
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current
            .as_object_mut()
            .expect("just ensured object")
            .insert(segments[segments.len() - 1].to_string(), value);
    }

    /// Removes a top-level key. Nested removal only needs the hidden loop
    /// counters, which are top-level.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Merges another environment's top-level keys into this one, overwriting
    /// on collision.
    pub fn merge(&mut self, other: VariableEnvironment) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    /// Returns true when the path is present and renders non-empty.
    #[must_use]
    pub fn is_present(&self, path: &str) -> bool {
        self.get(path).is_some_and(|value| !render_value(value).is_empty())
    }
}

impl From<Map<String, Value>> for VariableEnvironment {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for VariableEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_set_creates_intermediate_objects() {
        let mut env = VariableEnvironment::new();
        env.set("order.items.count", json!(3));
        assert_eq!(env.get("order.items.count"), Some(&json!(3)));
        assert!(env.get("order.items").is_some_and(Value::is_object));
    }

    #[test]
    fn set_replaces_non_object_intermediates() {
        let mut env = VariableEnvironment::new();
        env.set("order", json!("plain"));
        env.set("order.id", json!("42"));
        assert_eq!(env.get_string("order.id"), "42");
    }

    #[test]
    fn missing_path_renders_empty() {
        let env = VariableEnvironment::new();
        assert_eq!(env.get_string("missing.path"), "");
        assert!(!env.is_present("missing.path"));
    }

    #[test]
    fn merge_overwrites_top_level_keys() {
        let mut env = VariableEnvironment::new();
        env.set("last_message", json!("hi"));
        env.set("customer_name", json!("Ada"));

        let mut update = VariableEnvironment::new();
        update.set("last_message", json!("bye"));
        env.merge(update);

        assert_eq!(env.get_string("last_message"), "bye");
        assert_eq!(env.get_string("customer_name"), "Ada");
    }

    #[test]
    fn lookup_path_indexes_arrays() {
        let value = json!({"items": [{"name": "tea"}, {"name": "coffee"}]});
        assert_eq!(
            lookup_path(&value, "items.1.name"),
            Some(&json!("coffee"))
        );
        assert!(lookup_path(&value, "items.9.name").is_none());
    }

    #[test]
    fn render_value_strips_string_quotes() {
        assert_eq!(render_value(&json!("hello")), "hello");
        assert_eq!(render_value(&json!(12.5)), "12.5");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&Value::Null), "");
    }
}
