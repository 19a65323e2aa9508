// example/src/main.rs

use brine_flatjson::traits::{read_bool, read_integer, read_string};
use brine_flatjson::*;
use serde::Serialize;

/// A student record, declared by hand the way a `FlatRecord` type is.
#[derive(Debug, Serialize)]
struct Student {
    first_name:         String,
    last_name:          String,
    student_id:         i64,
    currently_enrolled: bool,
}

impl FlatRecord for Student {
    fn record_schema() -> RecordSchema {
        RecordSchema::new("Student", vec![
            FieldSpec::new("first_name", FieldKind::String),
            FieldSpec::new("last_name", FieldKind::String),
            FieldSpec::new("student_id", FieldKind::Integer),
            FieldSpec::new("currently_enrolled", FieldKind::Boolean),
        ])
    }

    fn from_record(record: &ParsedRecord) -> Result<Student, FlatJsonError> {
        Ok(Student {
            first_name:         read_string(record, "first_name")?,
            last_name:          read_string(record, "last_name")?,
            student_id:         read_integer(record, "student_id")?,
            currently_enrolled: read_bool(record, "currently_enrolled")?,
        })
    }
}

fn main() -> Result<(), FlatJsonError> {
    let json_data = r#"{
        "first_name": "John",
        "last_name": "Doe",
        "student_id": 12345,
        "currently_enrolled": true
    }"#;

    // Build the native parser; the workspace goes away when `parser` is dropped.
    let parser = compile_record::<Student>()?;

    // Untyped access, field by field.
    let record = parser.parse(json_data)?;
    println!("Parsed Student Information:");
    println!("First Name: {}", record["first_name"]);
    println!("Last Name: {}", record["last_name"]);
    println!("Student ID: {}", record["student_id"]);
    println!("Currently Enrolled: {}", record["currently_enrolled"]);

    // Typed access through `FlatRecord`.
    let student: Student = parser.parse_into(json_data)?;
    println!("{}", serde_json::to_string_pretty(&student)?);

    parser.close()?;
    Ok(())
}
