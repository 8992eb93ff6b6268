//! # Value Model
//!
//! Domain values, sparse records and primary-key sets.
//!
//! ## Absent vs NULL
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Record field states                                  │
//! │                                                                         │
//! │  Record { name: "Ana" }                  INSERT (name) VALUES (?)      │
//! │      email absent       ───────────────► email untouched (DB default)  │
//! │                                                                         │
//! │  Record { name: "Ana", email: Null }     INSERT (name, email) ...      │
//! │      email present/NULL ───────────────► email = NULL                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// Value
// =============================================================================

/// A single domain value.
///
/// Deserializes from plain JSON scalars. JSON strings always stay strings;
/// the column they are bound to decides whether they are read as dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    #[serde(skip_deserializing)]
    DateTime(NaiveDateTime),
    #[serde(skip_deserializing)]
    Date(NaiveDate),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for integer and double values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    /// Short name of the runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Date(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Raw Cell
// =============================================================================

/// A cell exactly as the driver handed it over, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Only produced when the driver itself reports a boolean.
    Bool(bool),
}

// =============================================================================
// Record
// =============================================================================

/// A sparse row: only fields that were explicitly set are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field (builder style).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field. `Value::Null` means "set the column to NULL".
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field, making it absent again.
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns true when the field is present (even if NULL).
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Ordered primary-key field → value mapping. `Value::Null` means `IS NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keys {
    entries: Vec<(String, Value)>,
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key (builder style).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Adds a key, replacing an existing one with the same name in place.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Keys {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut keys = Keys::new();
        for (k, v) in iter {
            keys.insert(k, v);
        }
        keys
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_absent_vs_null() {
        let record = Record::new().with("name", "Ana").with("email", Value::Null);

        assert!(record.has("email"));
        assert_eq!(record.get("email"), Some(&Value::Null));
        assert!(!record.has("phone"));
        assert_eq!(record.get("phone"), None);
    }

    #[test]
    fn test_keys_keep_insertion_order_and_replace() {
        let keys = Keys::new().with("b", 1).with("a", 2).with("b", 3);

        let names: Vec<&str> = keys.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(keys.get("b"), Some(&Value::Integer(3)));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_value_from_json_scalars() {
        let v: Value = serde_json::from_str("18").unwrap();
        assert_eq!(v, Value::Integer(18));

        let v: Value = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, Value::Double(2.5));

        let v: Value = serde_json::from_str("null").unwrap();
        assert_eq!(v, Value::Null);

        let v: Value = serde_json::from_str("\"2024-03-01\"").unwrap();
        assert_eq!(v, Value::String("2024-03-01".into()));

        let v: Value = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(v, Value::String("bob".into()));
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
