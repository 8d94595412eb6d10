//! The values mapping shared by the form and the store.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Store key the form persists its mapping under.
pub const STORAGE_KEY: &str = "values";

/// Errors raised while reading a persisted mapping.
#[derive(Debug, Error)]
pub enum ValuesError {
    /// Not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON, but not an object.
    #[error("expected a JSON object, found {0}")]
    NotObject(&'static str),
    /// A field holds something other than a string or a number.
    #[error("field `{key}` holds {kind}, expected a string")]
    Field {
        /// Offending field.
        key: String,
        /// JSON kind found instead.
        kind: &'static str,
    },
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Field key to field value. Missing keys read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, String>);

impl Values {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted mapping.
    ///
    /// Numbers are accepted and kept as their decimal text, `null` reads as
    /// an empty value.
    pub fn parse(raw: &str) -> Result<Self, ValuesError> {
        let json: serde_json::Value = serde_json::from_str(raw)?;
        let serde_json::Value::Object(map) = json else {
            return Err(ValuesError::NotObject(kind(&json)));
        };

        map.into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Null => String::new(),
                    other => {
                        return Err(ValuesError::Field {
                            kind: kind(&other),
                            key,
                        });
                    }
                };
                Ok((key, value))
            })
            .collect()
    }

    /// Serialize to the persisted form.
    pub fn to_json(&self) -> Result<String, ValuesError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Value of `key`, empty when unset.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    /// Store `value` under `key`. Returns whether the mapping changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        if self.0.get(key).map(String::as_str) == Some(value) {
            return false;
        }
        self.0.insert(key.to_string(), value.to_string());
        true
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Values {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let v = Values::parse(r#"{"first":"5","second":"hi"}"#).unwrap();
        assert_eq!(v.get("first"), "5");
        assert_eq!(v.get("second"), "hi");
        assert_eq!(v.get("third"), "");
        assert!(!v.contains("third"));
    }

    #[test]
    fn test_parse_numbers_and_null() {
        let v = Values::parse(r#"{"first": 42, "second": null}"#).unwrap();
        assert_eq!(v.get("first"), "42");
        assert_eq!(v.get("second"), "");
        assert!(v.contains("second"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Values::parse("{"), Err(ValuesError::Json(_))));
        assert!(matches!(Values::parse("[]"), Err(ValuesError::NotObject("an array"))));
        let err = Values::parse(r#"{"first": true}"#).unwrap_err();
        assert_eq!(err.to_string(), "field `first` holds a boolean, expected a string");
    }

    #[test]
    fn test_set_reports_change() {
        let mut v = Values::new();
        assert!(v.set("first", ""));
        assert!(!v.set("first", ""));
        assert!(v.set("first", "1"));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_to_json_sorted() {
        let v: Values = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(v.to_json().unwrap(), r#"{"a":"1","b":"2"}"#);
        assert_eq!(Values::parse(&v.to_json().unwrap()).unwrap(), v);
    }
}
