//! End-to-end tests: generate, compile with the system C compiler, run.
//!
//! Every test returns early when no C compiler can be found.

use brine_flatjson_compiler::{
    error::{BuildError, ParseError},
    BuildOptions, Builder, CompiledParser, ExecutionStrategy, WireProtocol,
};
use brine_flatjson_schema::{FieldKind, FieldSpec, RecordSchema, Value};
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn c_compiler_available() -> bool {
    let compiler = BuildOptions::default().compiler;
    let program = compiler.split_whitespace().next().unwrap_or("cc").to_string();
    Command::new(program)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

macro_rules! require_cc {
    () => {
        init_tracing();
        if !c_compiler_available() {
            eprintln!("skipping: no C compiler available");
            return;
        }
    };
}

fn person() -> RecordSchema {
    RecordSchema::new("Person", vec![
        FieldSpec::new("name", FieldKind::String),
        FieldSpec::new("age", FieldKind::Integer),
        FieldSpec::new("is_student", FieldKind::Boolean),
    ])
}

fn options() -> BuildOptions {
    BuildOptions::default().cflags(["-O0"])
}

fn build_with(options: BuildOptions, schema: &RecordSchema) -> CompiledParser {
    Builder::new(options).build(schema).expect("build failed")
}

#[test]
fn test_round_trip() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser
        .parse(r#"{"name": "John Doe", "age": 25, "is_student": true}"#)
        .expect("parse failed");

    let names: Vec<&str> = record.field_names().collect();
    assert_eq!(names, ["name", "age", "is_student"]);
    assert_eq!(record.get_str("name"), Some("John Doe"));
    assert_eq!(record.get_i64("age"), Some(25));
    assert_eq!(record.get_bool("is_student"), Some(true));
}

#[test]
fn test_missing_fields_take_zero_values() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser.parse(r#"{"name": "Ann"}"#).unwrap();
    assert_eq!(record.get_str("name"), Some("Ann"));
    assert_eq!(record["age"], Value::zero(FieldKind::Integer));
    assert_eq!(record.get_bool("is_student"), Some(false));

    let record = parser.parse("{}").unwrap();
    assert_eq!(record.get_str("name"), Some(""));
    assert_eq!(record.get_i64("age"), Some(0));
    assert_eq!(record.len(), 3);
}

#[test]
fn test_unknown_keys_are_skipped() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser
        .parse(r#"{"nick": "j}", "name": "Jo", "tags": [1, {"a": "]"}], "meta": {"x": null}, "age": -4}"#)
        .unwrap();
    assert_eq!(record.get_str("name"), Some("Jo"));
    assert_eq!(record.get_i64("age"), Some(-4));
    assert_eq!(record.get_bool("is_student"), Some(false));
}

#[test]
fn test_whitespace_and_key_order() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser
        .parse("  {\n  \"is_student\" : false ,\n\t\"age\":7,  \"name\" :\"x y\"\n}  ")
        .unwrap();
    assert_eq!(record.get_str("name"), Some("x y"));
    assert_eq!(record.get_i64("age"), Some(7));
    assert_eq!(record.get_bool("is_student"), Some(false));
}

#[test]
fn test_escaped_characters_in_strings() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser.parse(r#"{"name": "John \"Johnny\" Doe"}"#).unwrap();
    assert_eq!(record.get_str("name"), Some(r#"John "Johnny" Doe"#));

    let record = parser.parse(r#"{"name": "say \"hi\" a\\b c\/d"}"#).unwrap();
    assert_eq!(record.get_str("name"), Some(r#"say "hi" a\b c/d"#));
}

#[test]
fn test_malformed_input_is_rejected() {
    require_cc!();
    let parser = build_with(options(), &person());

    for input in [
        "",
        "not json",
        "[1, 2]",
        r#"{"name": "unterminated"#,
        r#"{"name": "a""#,
        r#"{"name": 5}"#,
        r#"{"age": "seven"}"#,
        r#"{"age": 99999999999999999999}"#,
        r#"{"is_student": yes}"#,
        r#"{"name" "a"}"#,
        r#"{name: "a"}"#,
        r#"{"name": John}"#,
        r#""name": "a"}"#,
    ] {
        match parser.parse(input) {
            Err(ParseError::Rejected { output }) => {
                assert_eq!(output, "ERROR|Failed to parse JSON", "input {:?}", input)
            }
            other => panic!("input {:?}: expected Rejected, got {:?}", input, other),
        }
    }

    // A rejection does not affect later calls.
    assert!(parser.parse(r#"{"age": 1}"#).is_ok());
}

#[test]
fn test_value_containing_failure_text() {
    require_cc!();
    let parser = build_with(options(), &person());

    let record = parser.parse(r#"{"name": "Failed to parse JSON"}"#).unwrap();
    assert_eq!(record.get_str("name"), Some("Failed to parse JSON"));
}

#[test]
fn test_reserved_words_as_field_names() {
    require_cc!();
    let schema = RecordSchema::new("Tricky", vec![
        FieldSpec::new("int", FieldKind::Integer),
        FieldSpec::new("default", FieldKind::String),
        FieldSpec::new("key", FieldKind::Boolean),
    ]);
    let parser = build_with(options(), &schema);

    let record = parser.parse(r#"{"default": "d", "int": 3, "key": true}"#).unwrap();
    assert_eq!(record.get_i64("int"), Some(3));
    assert_eq!(record.get_str("default"), Some("d"));
    assert_eq!(record.get_bool("key"), Some(true));
}

#[test]
fn test_macro_like_names() {
    require_cc!();
    let schema = RecordSchema::new("Person", vec![
        FieldSpec::new("unix", FieldKind::Integer),
        FieldSpec::new("linux", FieldKind::String),
        FieldSpec::new("typeof", FieldKind::Boolean),
        FieldSpec::new("Person_H", FieldKind::String),
        FieldSpec::new("EXIT_SUCCESS", FieldKind::Integer),
    ]);
    let parser = build_with(options(), &schema);

    let record = parser
        .parse(r#"{"unix": 1700000000, "linux": "yes", "typeof": true, "Person_H": "h", "EXIT_SUCCESS": 7}"#)
        .unwrap();
    assert_eq!(record.get_i64("unix"), Some(1700000000));
    assert_eq!(record.get_str("linux"), Some("yes"));
    assert_eq!(record.get_bool("typeof"), Some(true));
    assert_eq!(record.get_str("Person_H"), Some("h"));
    assert_eq!(record.get_i64("EXIT_SUCCESS"), Some(7));

    let unix = build_with(options(), &RecordSchema::new("unix", vec![
        FieldSpec::new("asm", FieldKind::Integer),
    ]));
    assert_eq!(unix.parse(r#"{"asm": 2}"#).unwrap().get_i64("asm"), Some(2));
}

#[test]
fn test_keyed_protocol() {
    require_cc!();
    let parser = build_with(options().protocol(WireProtocol::Keyed), &person());
    assert_eq!(parser.protocol(), WireProtocol::Keyed);

    let record = parser.parse(r#"{"age": 30, "name": "K"}"#).unwrap();
    let names: Vec<&str> = record.field_names().collect();
    assert_eq!(names, ["name", "age", "is_student"]);
    assert_eq!(record.get_str("name"), Some("K"));
    assert_eq!(record.get_i64("age"), Some(30));
    assert_eq!(record.get_bool("is_student"), Some(false));
}

#[test]
fn test_worker_matches_process_per_call() {
    require_cc!();
    let per_call = build_with(options(), &person());
    let worker = build_with(options().strategy(ExecutionStrategy::Worker), &person());
    assert_eq!(worker.strategy(), Some(ExecutionStrategy::Worker));

    for input in [
        r#"{"name": "John Doe", "age": 25, "is_student": true}"#,
        r#"{"name": "line\nbreak"}"#,
        "{}",
        "garbage",
        r#"{"age": 12}"#,
    ] {
        let a = per_call.parse(input);
        let b = worker.parse(input);
        match (a, b) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "input {:?}", input),
            (Err(ParseError::Rejected { .. }), Err(ParseError::Rejected { .. })) => {}
            (a, b) => panic!("input {:?}: {:?} vs {:?}", input, a, b),
        }
    }
}

#[test]
fn test_timeout_allows_fast_parses() {
    require_cc!();
    let parser = build_with(options().timeout(Duration::from_secs(30)), &person());
    assert_eq!(parser.timeout(), Some(Duration::from_secs(30)));
    assert!(parser.parse(r#"{"age": 1}"#).is_ok());

    parser.set_timeout(None);
    assert_eq!(parser.timeout(), None);
    assert!(parser.parse(r#"{"age": 2}"#).is_ok());
}

#[test]
fn test_close_removes_workspace() {
    require_cc!();
    let root = tempfile::tempdir().expect("tempdir");
    let parser = build_with(options().workspace_root(root.path()), &person());

    let workspace = parser.workspace().expect("workspace");
    let executable = parser.executable().expect("executable");
    assert!(workspace.starts_with(root.path()));
    assert!(executable.is_file());
    assert!(workspace.join("Person.h").is_file());
    assert!(workspace.join("Person.c").is_file());
    assert!(workspace.join("main_Person.c").is_file());

    parser.close().expect("close failed");
    assert!(parser.is_closed());
    assert!(!workspace.exists());
    assert_eq!(parser.workspace(), None);

    parser.close().expect("second close failed");

    match parser.parse("{}") {
        Err(ParseError::Closed) => {}
        other => panic!("expected Closed, got {:?}", other),
    }
}

#[test]
fn test_drop_removes_workspace() {
    require_cc!();
    let parser = build_with(options().strategy(ExecutionStrategy::Worker), &person());
    assert!(parser.parse("{}").is_ok());
    let workspace = parser.workspace().expect("workspace");
    drop(parser);
    assert!(!workspace.exists());
}

#[test]
fn test_handles_are_independent() {
    require_cc!();
    let people = build_with(options(), &person());
    let flags = build_with(options(), &RecordSchema::new("Flags", vec![
        FieldSpec::new("enabled", FieldKind::Boolean),
    ]));
    let second_people = build_with(options(), &person());
    assert_ne!(people.workspace(), second_people.workspace());

    people.close().unwrap();
    assert!(matches!(people.parse("{}"), Err(ParseError::Closed)));

    let record = flags.parse(r#"{"enabled": true}"#).unwrap();
    assert_eq!(record.get_bool("enabled"), Some(true));
    let record = second_people.parse(r#"{"name": "still here"}"#).unwrap();
    assert_eq!(record.get_str("name"), Some("still here"));
}

#[test]
fn test_concurrent_parses() {
    require_cc!();
    for strategy in [ExecutionStrategy::ProcessPerCall, ExecutionStrategy::Worker] {
        let parser = Arc::new(build_with(options().strategy(strategy), &person()));

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let parser = Arc::clone(&parser);
                thread::spawn(move || {
                    for j in 0..5 {
                        let age = i * 100 + j;
                        let input = format!(r#"{{"name": "t{}", "age": {}}}"#, i, age);
                        let record = parser.parse(&input).expect("parse failed");
                        assert_eq!(record.get_str("name"), Some(format!("t{}", i).as_str()));
                        assert_eq!(record.get_i64("age"), Some(age));
                    }
                })
            })
            .collect();

        for handle in threads {
            handle.join().expect("worker thread panicked");
        }
        parser.close().unwrap();
    }
}

#[test]
fn test_bad_cflags_fail_the_build() {
    require_cc!();
    let root = tempfile::tempdir().expect("tempdir");
    let options = options()
        .cflags(["-DBFJ_UNUSED", "--definitely-not-a-flag"])
        .workspace_root(root.path());

    match Builder::new(options).build(&person()) {
        Err(BuildError::ExternalBuildFailed { output, .. }) => assert!(!output.is_empty()),
        other => panic!("expected ExternalBuildFailed, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
