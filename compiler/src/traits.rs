use crate::error::FlatJsonError;
use brine_flatjson_schema::{ParsedRecord, RecordSchema, Value};

/// Rust types that mirror one flat record.
///
/// `record_schema` describes the record to the compiler, `from_record` reads a
/// decoded record back into the type.
pub trait FlatRecord: Sized {
    fn record_schema() -> RecordSchema;
    fn from_record(record: &ParsedRecord) -> Result<Self, FlatJsonError>;
}

fn field<'a>(record: &'a ParsedRecord, name: &str) -> Result<&'a Value, FlatJsonError> {
    record
        .get(name)
        .ok_or_else(|| FlatJsonError::MissingField(name.to_string()))
}

fn wrong_kind(name: &str, expected: &'static str, found: &Value) -> FlatJsonError {
    FlatJsonError::WrongKind {
        field: name.to_string(),
        expected,
        found: format!("{} \"{}\"", found.kind(), found),
    }
}

pub fn read_string(record: &ParsedRecord, name: &str) -> Result<String, FlatJsonError> {
    match field(record, name)? {
        Value::String(s) => Ok(s.clone()),
        other            => Err(wrong_kind(name, "string", other)),
    }
}

pub fn read_integer(record: &ParsedRecord, name: &str) -> Result<i64, FlatJsonError> {
    let value = field(record, name)?;
    value.as_i64().ok_or_else(|| wrong_kind(name, "int", value))
}

pub fn read_bool(record: &ParsedRecord, name: &str) -> Result<bool, FlatJsonError> {
    match field(record, name)? {
        Value::Boolean(b) => Ok(*b),
        other             => Err(wrong_kind(name, "bool", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brine_flatjson_schema::{FieldKind, FieldSpec};

    #[derive(Debug, PartialEq)]
    struct Point {
        label: String,
        x:     i64,
        shown: bool,
    }

    impl FlatRecord for Point {
        fn record_schema() -> RecordSchema {
            RecordSchema::new("Point", vec![
                FieldSpec::new("label", FieldKind::String),
                FieldSpec::new("x", FieldKind::Integer),
                FieldSpec::new("shown", FieldKind::Boolean),
            ])
        }

        fn from_record(record: &ParsedRecord) -> Result<Point, FlatJsonError> {
            Ok(Point {
                label: read_string(record, "label")?,
                x:     read_integer(record, "x")?,
                shown: read_bool(record, "shown")?,
            })
        }
    }

    #[test]
    fn test_from_record() {
        let record: ParsedRecord = vec![
            ("label".to_string(), Value::from("origin")),
            ("x".to_string(), Value::from(-3i64)),
            ("shown".to_string(), Value::from(true)),
        ]
        .into_iter()
        .collect();

        let point = Point::from_record(&record).unwrap();
        assert_eq!(point, Point { label: "origin".into(), x: -3, shown: true });
        assert_eq!(Point::record_schema().fields.len(), 3);
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let mut record = ParsedRecord::new();
        record.insert("label", Value::from("a"));
        let err = Point::from_record(&record).unwrap_err();
        assert!(matches!(err, FlatJsonError::MissingField(ref f) if f == "x"), "got {:?}", err);

        record.insert("x", Value::from("seven"));
        let err = Point::from_record(&record).unwrap_err();
        assert!(matches!(err, FlatJsonError::WrongKind { expected: "int", .. }), "got {:?}", err);

        record.insert("x", Value::Integer("not-a-number".into()));
        assert!(read_integer(&record, "x").is_err());
    }
}
