use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use brine_flatjson::{
    load_schemas, select_schema, BuildOptions, Builder, ExecutionStrategy, FlatJsonError,
    RecordSchema, WireProtocol,
};
use brine_flatjson_compiler::{
    compile_schema_to_c,
    driver::{driver_file, generate_driver},
    error::CompileError,
    type_map::c_type_for_declared,
    validate,
};

#[derive(Parser)]
#[command(name = "bfj")]
#[command(about = "Validate flat record schemas, generate C parsers for them, and run those parsers", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a `.json` or `.bfj` schema file, printing its fields
    Check {
        /// Input schema file
        schema: PathBuf,

        /// Only check the record with this name
        #[arg(short, long)]
        record: Option<String>,
    },

    /// Generate the C header, implementation and driver for a record
    Gen {
        /// Input schema file
        schema: PathBuf,

        /// Record to generate (may be omitted when the file holds one record)
        #[arg(short, long)]
        record: Option<String>,

        /// Output directory (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output layout of the generated parser: positional or keyed
        #[arg(short, long)]
        protocol: Option<WireProtocol>,
    },

    /// Build a parser for a record and parse documents with it
    Parse {
        /// Input schema file
        schema: PathBuf,

        /// JSON documents (if omitted, one document per line of stdin)
        documents: Vec<String>,

        /// Record to build (may be omitted when the file holds one record)
        #[arg(short, long)]
        record: Option<String>,

        /// Keep one parser process running instead of one per document
        #[arg(short, long)]
        worker: bool,

        /// Output layout of the generated parser: positional or keyed
        #[arg(short, long)]
        protocol: Option<WireProtocol>,

        /// Per-document time limit in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<(), FlatJsonError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { schema, record } => {
            let mut schemas = load_schemas(&schema)?;
            if let Some(name) = record.as_deref() {
                schemas = vec![select_schema(schemas, Some(name))?];
            }
            for schema in &schemas {
                check(schema)?;
            }
            Ok(())
        }

        Commands::Gen { schema, record, output, protocol } => {
            let schema = select_schema(load_schemas(&schema)?, record.as_deref())?;
            let mut options = BuildOptions::from_env();
            if let Some(protocol) = protocol {
                options.protocol = protocol;
            }

            if let Some(dir) = output {
                let files = Builder::new(options).emit(&schema, &dir)?;
                println!("Generated {}", files.header.display());
                println!("Generated {}", files.implementation.display());
                println!("Generated {}", files.driver.display());
            } else {
                let source = compile_schema_to_c(&schema, options.protocol)?;
                let driver = generate_driver(&source).map_err(CompileError::from)?;
                let (header, implementation) = source.split().map_err(CompileError::from)?;
                println!("// ---- {} ----\n{}", source.header_file(), header);
                println!("// ---- {} ----\n{}", source.source_file(), implementation);
                println!("// ---- {} ----\n{}", driver_file(&source.record_name), driver);
            }
            Ok(())
        }

        Commands::Parse { schema, documents, record, worker, protocol, timeout_ms } => {
            let schema = select_schema(load_schemas(&schema)?, record.as_deref())?;
            let mut options = BuildOptions::from_env();
            if worker {
                options.strategy = ExecutionStrategy::Worker;
            }
            if let Some(protocol) = protocol {
                options.protocol = protocol;
            }
            if let Some(ms) = timeout_ms {
                options.timeout = Some(Duration::from_millis(ms));
            }
            debug!(?options, "build options");

            let parser = Builder::new(options).build(&schema)?;

            let documents = if documents.is_empty() {
                io::stdin()
                    .lock()
                    .lines()
                    .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                documents
            };

            let mut failures = 0;
            for document in &documents {
                match parser.parse(document) {
                    Ok(record) => println!("{}", serde_json::to_string(&record)?),
                    Err(err) => {
                        warn!(%err, "document rejected");
                        eprintln!("error: {}", err);
                        failures += 1;
                    }
                }
            }

            parser.close()?;
            if failures > 0 {
                eprintln!("{} of {} documents failed", failures, documents.len());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Validates one schema and prints its field table.
fn check(schema: &RecordSchema) -> Result<(), FlatJsonError> {
    let validated = validate(schema)?;
    println!("{} ({} fields)", validated.name(), validated.fields().len());

    for spec in &schema.fields {
        let declared = spec.type_.as_deref().unwrap_or("");
        let c_type = c_type_for_declared(declared).unwrap_or("?");
        println!("  {:<24} {:<10} {}", spec.name, declared, c_type);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "bfj", "-vv", "parse", "person.bfj", "--worker", "--protocol", "keyed",
            "--timeout-ms", "250", "{}", r#"{"age": 1}"#,
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Parse { schema, documents, worker, protocol, timeout_ms, record } => {
                assert_eq!(schema, PathBuf::from("person.bfj"));
                assert_eq!(documents.len(), 2);
                assert!(worker);
                assert_eq!(protocol, Some(WireProtocol::Keyed));
                assert_eq!(timeout_ms, Some(250));
                assert_eq!(record, None);
            }
            _ => panic!("expected parse"),
        }

        assert!(Cli::try_parse_from(["bfj", "gen", "p.json", "--protocol", "xml"]).is_err());
    }
}
