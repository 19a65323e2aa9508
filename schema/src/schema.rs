use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of primitive kinds a record field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::String, FieldKind::Integer, FieldKind::Boolean];

    /// Resolves a declared type name (`"string"`, `"int"`, `"bool"`, ...).
    /// Returns `None` for anything outside the supported set.
    pub fn from_type_name(name: &str) -> Option<FieldKind> {
        match name {
            "string" | "str" | "char*" => Some(FieldKind::String),
            "int" | "integer" | "int64" => Some(FieldKind::Integer),
            "bool" | "boolean" => Some(FieldKind::Boolean),
            _ => None,
        }
    }

    /// The canonical declared name, as written by [`FieldSpec::new`].
    pub fn type_name(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "int",
            FieldKind::Boolean => "bool",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One field as declared by whatever produced the schema.
///
/// The type is kept as the declared name so that a missing or unsupported type
/// can be reported by validation instead of being lost at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            type_: Some(kind.type_name().to_string()),
        }
    }

    /// A field whose type is given by name, supported or not.
    pub fn declared(name: impl Into<String>, type_name: impl Into<String>) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            type_: Some(type_name.into()),
        }
    }

    /// A field with no type at all.
    pub fn untyped(name: impl Into<String>) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            type_: None,
        }
    }

    pub fn kind(&self) -> Option<FieldKind> {
        self.type_.as_deref().and_then(FieldKind::from_type_name)
    }
}

/// A named, flat record: an ordered list of typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> RecordSchema {
        RecordSchema {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_aliases() {
        assert_eq!(FieldKind::from_type_name("char*"), Some(FieldKind::String));
        assert_eq!(FieldKind::from_type_name("integer"), Some(FieldKind::Integer));
        assert_eq!(FieldKind::from_type_name("boolean"), Some(FieldKind::Boolean));
        assert_eq!(FieldKind::from_type_name("float"), None);
        assert_eq!(FieldKind::from_type_name(""), None);
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_type_name(kind.type_name()), Some(kind));
        }
    }

    #[test]
    fn test_schema_from_json() {
        let text = r#"{
            "name": "Person",
            "fields": [
                { "name": "name", "type": "string" },
                { "name": "age", "type": "int" },
                { "name": "nickname" }
            ]
        }"#;
        let schema: RecordSchema = serde_json::from_str(text).unwrap();
        assert_eq!(schema.name, "Person");
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[0].kind(), Some(FieldKind::String));
        assert_eq!(schema.fields[1].kind(), Some(FieldKind::Integer));
        assert_eq!(schema.fields[2].type_, None);
        assert_eq!(schema.field("age").unwrap().name, "age");
        assert!(schema.field("missing").is_none());
    }
}
