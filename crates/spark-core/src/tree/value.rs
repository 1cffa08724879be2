//! Primitive values and declaration maps.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::css::normalize_property;
use crate::path::KeyPath;

/// A primitive leaf value: a string or a number.
///
/// Numbers are printed without a trailing `.0` when integral; no unit is
/// appended, so `padding: 4` stays `4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Returns the text content if this is a string value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

/// An ordered map of CSS property names to values.
///
/// Property names are normalized on insertion (`backgroundColor` becomes
/// `background-color`), so authoring style does not leak into the output.
/// Setting an existing property replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Declarations(IndexMap<String, Value>);

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration, returning `self` for chaining.
    ///
    /// ```rust
    /// use spark_core::Declarations;
    ///
    /// let decls = Declarations::new()
    ///     .with("backgroundColor", "red")
    ///     .with("padding", 4);
    /// assert_eq!(decls.get("background-color").unwrap().to_string(), "red");
    /// ```
    pub fn with(mut self, property: &str, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    /// Sets a declaration, replacing any previous value for the property.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) {
        self.0.insert(normalize_property(property), value.into());
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(&normalize_property(property))
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(&normalize_property(property))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Shallow merge: properties of `patch` win, new ones are appended.
    pub fn merge(&self, patch: &Declarations) -> Declarations {
        let mut merged = self.clone();
        for (property, value) in &patch.0 {
            merged.0.insert(property.clone(), value.clone());
        }
        merged
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Declarations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut decls = Declarations::new();
        for (k, v) in iter {
            decls.set(k.as_ref(), v);
        }
        decls
    }
}

impl<'de> Deserialize<'de> for Declarations {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        super::parse::declarations(&raw, &KeyPath::root()).map_err(serde::de::Error::custom)
    }
}
