use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// A schema that cannot be compiled. Checked before any code is generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Record name is empty")]
    EmptyName,

    #[error("Invalid record name \"{0}\": must be a valid C identifier")]
    InvalidName(String),

    #[error("Record has no fields")]
    NoFields,

    #[error("Empty field name")]
    EmptyFieldName,

    #[error("Invalid field name \"{0}\": must be a valid C identifier")]
    InvalidFieldName(String),

    #[error("Duplicate field name \"{0}\"")]
    DuplicateFieldName(String),

    #[error("Empty type for field \"{0}\"")]
    EmptyType(String),

    #[error("Unsupported type \"{type_}\" for field \"{field}\"")]
    UnsupportedType { field: String, type_: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown placeholder \"{{{{{0}}}}}\" in template {1}")]
    UnknownPlaceholder(String, &'static str),

    #[error("Unterminated placeholder in template {0}")]
    Unterminated(&'static str),

    #[error("Generated source has no header guard marker \"{0}\"")]
    MissingMarker(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Code generation failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to create workspace directory: {0}")]
    WorkspaceCreateFailed(#[source] std::io::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    SourceWriteFailed {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run C compiler \"{compiler}\": {source}")]
    CompilerSpawnFailed {
        compiler: String,
        #[source]
        source:   std::io::Error,
    },

    #[error("Compilation failed ({status})\nOutput: {output}")]
    ExternalBuildFailed {
        status: ExitStatus,
        output: String,
    },
}

impl From<CompileError> for BuildError {
    fn from(err: CompileError) -> BuildError {
        match err {
            CompileError::Schema(e)   => BuildError::Schema(e),
            CompileError::Template(e) => BuildError::Template(e),
        }
    }
}

/// The artifact printed something that is not a success record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Parser produced no output")]
    Empty,

    #[error("Parser output does not start with SUCCESS: {0}")]
    MissingSentinel(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parser has been closed")]
    Closed,

    #[error("Failed to start parser process: {0}")]
    ProcessSpawnFailed(#[source] std::io::Error),

    #[error("Parser did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Parsing failed: {output}")]
    Rejected { output: String },

    #[error("Malformed parser output: {0}")]
    MalformedOutput(#[from] DecodeError),

    #[error("I/O error talking to parser: {0}")]
    Io(#[from] std::io::Error),
}

/// Error in a `.bfj` declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at line {line}, column {column}: {msg}")]
pub struct DeclError {
    pub msg:    String,
    pub line:   usize,
    pub column: usize,
}

/// Everything the facade and the command line can fail with.
#[derive(Debug, Error)]
pub enum FlatJsonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Decl(#[from] DeclError),

    #[error("Verifier error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Missing required field \"{0}\"")]
    MissingField(String),

    #[error("Field \"{field}\" holds {found}, expected {expected}")]
    WrongKind {
        field:    String,
        expected: &'static str,
        found:    String,
    },

    #[error("No record named \"{0}\" in schema file")]
    UnknownRecord(String),
}
