use std::collections::HashSet;
use crate::{
    error::SchemaError,
    utils::is_identifier,
};
use brine_flatjson_schema::{FieldKind, RecordSchema};

/// A field whose type has been resolved to one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// A schema that passed [`validate`]. Only this type reaches code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSchema {
    name:   String,
    fields: Vec<Field>,
}

impl ValidatedSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Checks a schema in a fixed order and reports the first rule it breaks:
/// record name, then field presence, then each field in declaration order
/// (name, identifier grammar, uniqueness, type).
pub fn validate(schema: &RecordSchema) -> Result<ValidatedSchema, SchemaError> {
    if schema.name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    if !is_identifier(&schema.name) {
        return Err(SchemaError::InvalidName(schema.name.clone()));
    }
    if schema.fields.is_empty() {
        return Err(SchemaError::NoFields);
    }

    let mut seen   = HashSet::new();
    let mut fields = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        if field.name.is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        if !is_identifier(&field.name) {
            return Err(SchemaError::InvalidFieldName(field.name.clone()));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateFieldName(field.name.clone()));
        }

        let kind = match field.type_.as_deref() {
            None | Some("") => return Err(SchemaError::EmptyType(field.name.clone())),
            Some(ty) => FieldKind::from_type_name(ty).ok_or_else(|| SchemaError::UnsupportedType {
                field: field.name.clone(),
                type_: ty.to_string(),
            })?,
        };

        fields.push(Field {
            name: field.name.clone(),
            kind,
        });
    }

    Ok(ValidatedSchema {
        name: schema.name.clone(),
        fields,
    })
}
