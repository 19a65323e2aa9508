use crate::{
    error::DecodeError,
    protocol::{WireProtocol, FIELD_DELIMITER, SUCCESS_SENTINEL},
    verifier::{Field, ValidatedSchema},
};
use brine_flatjson_schema::{FieldKind, ParsedRecord, Value};

/// Turns the text a compiled parser printed into a typed record.
pub fn decode(schema: &ValidatedSchema, raw: &str, protocol: WireProtocol) -> Result<ParsedRecord, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut tokens = trimmed.split(FIELD_DELIMITER).map(str::trim);
    if tokens.next() != Some(SUCCESS_SENTINEL) {
        return Err(DecodeError::MissingSentinel(trimmed.to_string()));
    }

    let record = match protocol {
        WireProtocol::Positional => schema
            .fields()
            .iter()
            .zip(tokens)
            .map(|(field, token)| (field.name.clone(), coerce(field, token)))
            .collect(),
        WireProtocol::Keyed => {
            let pairs: Vec<(&str, &str)> = tokens.filter_map(|token| token.split_once('=')).collect();
            schema
                .fields()
                .iter()
                .filter_map(|field| {
                    pairs
                        .iter()
                        .rev()
                        .find(|(name, _)| *name == field.name)
                        .map(|(_, token)| (field.name.clone(), coerce(field, token)))
                })
                .collect()
        }
    };

    Ok(record)
}

/// Whether `raw` is a success record, whatever its values hold.
pub fn is_success(raw: &str) -> bool {
    raw.trim().split(FIELD_DELIMITER).next().map(str::trim) == Some(SUCCESS_SENTINEL)
}

fn coerce(field: &Field, token: &str) -> Value {
    match field.kind {
        FieldKind::String  => Value::String(token.to_string()),
        FieldKind::Integer => Value::Integer(token.to_string()),
        FieldKind::Boolean => Value::Boolean(token == "true"),
    }
}
