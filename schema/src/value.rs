use crate::schema::FieldKind;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Index;

/// One decoded field value.
///
/// Integers are carried as the text the compiled parser printed; use
/// [`Value::as_i64`] to get a number out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(String),
    Boolean(bool),
}

impl Value {
    /// The zero value a compiled parser reports for a field missing from the input.
    pub fn zero(kind: FieldKind) -> Value {
        match kind {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Integer => Value::Integer("0".to_string()),
            FieldKind::Boolean => Value::Boolean(false),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Value::String(_) => FieldKind::String,
            Value::Integer(_) => FieldKind::Integer,
            Value::Boolean(_) => FieldKind::Boolean,
        }
    }

    /// The textual form of a [String](#variant.String) or [Integer](#variant.Integer).
    /// Returns `""` for booleans.
    pub fn as_str(&self) -> &str {
        match self {
            Value::String(value) | Value::Integer(value) => value.as_str(),
            Value::Boolean(_) => "",
        }
    }

    /// Returns `false` for anything but a [Boolean](#variant.Boolean).
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Parses an [Integer](#variant.Integer). Returns `None` for other value kinds
    /// or text that does not fit an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(text) => text.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) | Value::Integer(value) => f.write_str(value),
            Value::Boolean(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Integer(value.to_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(value) => serializer.serialize_str(value),
            Value::Integer(text) => match text.parse::<i64>() {
                Ok(number) => serializer.serialize_i64(number),
                Err(_) => serializer.serialize_str(text),
            },
            Value::Boolean(value) => serializer.serialize_bool(*value),
        }
    }
}

/// Field name to value, in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParsedRecord {
    values: IndexMap<String, Value>,
}

impl ParsedRecord {
    pub fn new() -> ParsedRecord {
        ParsedRecord::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(Value::Boolean(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

impl<'a> Index<&'a str> for ParsedRecord {
    type Output = Value;

    fn index(&self, name: &'a str) -> &Value {
        &self.values[name]
    }
}

impl FromIterator<(String, Value)> for ParsedRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> ParsedRecord {
        ParsedRecord {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero(FieldKind::String), Value::String(String::new()));
        assert_eq!(Value::zero(FieldKind::Integer).as_str(), "0");
        assert_eq!(Value::zero(FieldKind::Boolean), Value::Boolean(false));
    }

    #[test]
    fn test_integer_stays_text() {
        let value = Value::Integer("25".to_string());
        assert_eq!(value.as_str(), "25");
        assert_eq!(value.as_i64(), Some(25));
        assert_eq!(Value::Integer("99999999999999999999".into()).as_i64(), None);
        assert_eq!(Value::String("25".into()).as_i64(), None);
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut record = ParsedRecord::new();
        record.insert("name", Value::from("John Doe"));
        record.insert("age", Value::from(25));
        record.insert("is_student", Value::from(true));

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, ["name", "age", "is_student"]);
        assert_eq!(record.get_str("name"), Some("John Doe"));
        assert_eq!(record.get_i64("age"), Some(25));
        assert_eq!(record.get_bool("is_student"), Some(true));
        assert_eq!(record["age"], Value::Integer("25".into()));
        assert_eq!(record.get_str("age"), None);
    }

    #[test]
    fn test_record_serializes_as_object() {
        let record: ParsedRecord = vec![
            ("name".to_string(), Value::from("X")),
            ("age".to_string(), Value::Integer("-3".into())),
            ("odd".to_string(), Value::Integer("1e3".into())),
            ("ok".to_string(), Value::Boolean(false)),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"X","age":-3,"odd":"1e3","ok":false}"#);
    }
}
