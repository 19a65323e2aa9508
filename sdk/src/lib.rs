//! brine-flatjson
//!
//! Compile flat record schemas into native JSON parsers and use them from Rust.
//!
//! - `FlatRecord` trait (re-exported from compiler)
//! - `compile_record` / `compile_record_with` for `FlatRecord` types
//! - `load_schemas` for `.json` and `.bfj` schema files

use serde::Deserialize;
use std::fs;
use std::path::Path;

pub use brine_flatjson_compiler::traits::FlatRecord;
pub use brine_flatjson_compiler::error::FlatJsonError;
pub use brine_flatjson_compiler::{
    build, BuildOptions, Builder, CompiledParser, ExecutionStrategy, WireProtocol,
};
pub use brine_flatjson_schema::{FieldKind, FieldSpec, ParsedRecord, RecordSchema, Value};

/// Builds a parser for `T` with options read from the environment.
pub fn compile_record<T: FlatRecord>() -> Result<CompiledParser, FlatJsonError> {
    compile_record_with::<T>(BuildOptions::from_env())
}

pub fn compile_record_with<T: FlatRecord>(options: BuildOptions) -> Result<CompiledParser, FlatJsonError> {
    Ok(Builder::new(options).build(&T::record_schema())?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    Many(Vec<RecordSchema>),
    One(RecordSchema),
}

/// Reads every record schema in `path`. Files ending in `.json` hold one
/// schema object or an array of them; anything else is read as declarations.
pub fn load_schemas(path: impl AsRef<Path>) -> Result<Vec<RecordSchema>, FlatJsonError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        Ok(match serde_json::from_str(&text)? {
            SchemaFile::Many(schemas) => schemas,
            SchemaFile::One(schema)   => vec![schema],
        })
    } else {
        Ok(brine_flatjson_compiler::parse_decl(&text)?)
    }
}

/// Picks the schema called `name`, or the only one when `name` is `None`.
pub fn select_schema(schemas: Vec<RecordSchema>, name: Option<&str>) -> Result<RecordSchema, FlatJsonError> {
    match name {
        Some(name) => schemas
            .into_iter()
            .find(|schema| schema.name == name)
            .ok_or_else(|| FlatJsonError::UnknownRecord(name.to_string())),
        None => {
            let mut schemas = schemas.into_iter();
            match (schemas.next(), schemas.next()) {
                (Some(schema), None) => Ok(schema),
                (None, _)            => Err(FlatJsonError::UnknownRecord("<none>".to_string())),
                (Some(_), Some(_))   => Err(FlatJsonError::UnknownRecord(
                    "<ambiguous: pass a record name>".to_string(),
                )),
            }
        }
    }
}

pub mod traits {
    pub use brine_flatjson_compiler::traits::{read_bool, read_integer, read_string, FlatRecord};
}

pub mod error {
    pub use brine_flatjson_compiler::error::{
        BuildError, DecodeError, FlatJsonError, ParseError, SchemaError,
    };
}

pub mod schema {
    pub use brine_flatjson_schema::{FieldKind, FieldSpec, ParsedRecord, RecordSchema, Value};
}
