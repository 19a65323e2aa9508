//! brine-flatjson-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.bfj` record declarations,
//!  2) A schema validator (names, duplicate fields, supported types),
//!  3) C code generation (`compile_schema_to_c` → header + implementation + driver),
//!  4) A builder that compiles the generated C into a native parser in a scoped workspace,
//!  5) `CompiledParser` handles that run that parser, per call or as a worker,
//!  6) Error types and the `FlatRecord` trait.

pub mod error;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod verifier;
pub mod type_map;
pub mod protocol;
pub mod template;
pub mod gen_c;
pub mod driver;
pub mod config;
pub mod decoder;
pub mod backend;
pub mod handle;
pub mod builder;
pub mod traits;

pub use builder::{build, Builder, SourceFiles};
pub use config::{BuildOptions, ExecutionStrategy};
pub use gen_c::{compile_schema_to_c, GeneratedSource};
pub use handle::CompiledParser;
pub use parser::parse_decl;
pub use protocol::WireProtocol;
pub use verifier::{validate, ValidatedSchema};
