//! Types describing a flat record schema and the values a compiled parser
//! hands back for it.
//!
//! ```
//! use brine_flatjson_schema::*;
//!
//! let schema = RecordSchema::new("Person", vec![
//!     FieldSpec::new("name", FieldKind::String),
//!     FieldSpec::new("age", FieldKind::Integer),
//!     FieldSpec::new("is_student", FieldKind::Boolean),
//! ]);
//!
//! assert_eq!(schema.fields[1].type_.as_deref(), Some("int"));
//! assert_eq!(FieldKind::from_type_name("bool"), Some(FieldKind::Boolean));
//! ```

pub mod schema;
pub mod value;

pub use schema::*;
pub use value::*;
