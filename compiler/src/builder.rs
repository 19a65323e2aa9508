use crate::{
    backend::backend_for,
    config::{BuildOptions, DEFAULT_COMPILER},
    driver::{driver_file, generate_driver},
    error::BuildError,
    gen_c::{generate_c, GeneratedSource},
    handle::{Artifact, CompiledParser},
    verifier::validate,
};
use brine_flatjson_schema::RecordSchema;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Paths of the three C files written for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub header:         PathBuf,
    pub implementation: PathBuf,
    pub driver:         PathBuf,
}

/// Turns record schemas into ready-to-use [`CompiledParser`]s.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    options: BuildOptions,
}

/// Builds a parser with [`BuildOptions::default`].
pub fn build(schema: &RecordSchema) -> Result<CompiledParser, BuildError> {
    Builder::default().build(schema)
}

impl Builder {
    pub fn new(options: BuildOptions) -> Builder {
        Builder { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Validates, generates, compiles. The workspace is removed again on every
    /// failure; on success it belongs to the returned parser.
    pub fn build(&self, schema: &RecordSchema) -> Result<CompiledParser, BuildError> {
        let validated = validate(schema)?;
        let source = generate_c(&validated, self.options.protocol)?;
        let driver = generate_driver(&source)?;

        let workspace = self.create_workspace(validated.name())?;
        let files = write_sources(workspace.path(), &source, &driver)?;

        let executable = workspace
            .path()
            .join(format!("parser_{}{}", validated.name(), std::env::consts::EXE_SUFFIX));
        self.compile(&files, &executable)?;

        info!(
            record = %validated.name(),
            fields = validated.fields().len(),
            executable = %executable.display(),
            strategy = %self.options.strategy,
            protocol = %self.options.protocol,
            "built parser"
        );

        let backend = backend_for(self.options.strategy, executable.clone());
        Ok(CompiledParser::new(
            validated,
            self.options.protocol,
            self.options.timeout,
            Artifact { workspace, executable },
            backend,
        ))
    }

    /// Writes the header, implementation and driver into `dir` without compiling.
    pub fn emit(&self, schema: &RecordSchema, dir: &Path) -> Result<SourceFiles, BuildError> {
        let validated = validate(schema)?;
        let source = generate_c(&validated, self.options.protocol)?;
        let driver = generate_driver(&source)?;

        fs::create_dir_all(dir).map_err(BuildError::WorkspaceCreateFailed)?;
        write_sources(dir, &source, &driver)
    }

    fn create_workspace(&self, record_name: &str) -> Result<TempDir, BuildError> {
        let prefix = format!("bfj-{}-", record_name);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let workspace = match &self.options.workspace_root {
            Some(root) => {
                fs::create_dir_all(root).map_err(BuildError::WorkspaceCreateFailed)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(BuildError::WorkspaceCreateFailed)?;

        debug!(workspace = %workspace.path().display(), "created build workspace");
        Ok(workspace)
    }

    fn compile(&self, files: &SourceFiles, executable: &Path) -> Result<(), BuildError> {
        // `CC` may carry a wrapper, e.g. "ccache gcc".
        let mut words = self.options.compiler.split_whitespace();
        let program = words.next().unwrap_or(DEFAULT_COMPILER);

        let mut command = Command::new(program);
        command
            .args(words)
            .args(&self.options.cflags)
            .arg("-o")
            .arg(executable)
            .arg(&files.driver)
            .arg(&files.implementation);
        debug!(command = ?command, "running C compiler");

        let output = command.output().map_err(|source| BuildError::CompilerSpawnFailed {
            compiler: self.options.compiler.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(BuildError::ExternalBuildFailed {
                status: output.status,
                output: combined,
            });
        }
        if !combined.trim().is_empty() {
            debug!(output = %combined.trim(), "C compiler output");
        }
        Ok(())
    }
}

/// Splits the generated text at the header marker and writes all three files.
fn write_sources(dir: &Path, source: &GeneratedSource, driver: &str) -> Result<SourceFiles, BuildError> {
    let (header, implementation) = source.split()?;
    let files = SourceFiles {
        header:         dir.join(source.header_file()),
        implementation: dir.join(source.source_file()),
        driver:         dir.join(driver_file(&source.record_name)),
    };

    for (path, contents) in [
        (&files.header, header),
        (&files.implementation, implementation),
        (&files.driver, driver),
    ] {
        fs::write(path, contents).map_err(|source| BuildError::SourceWriteFailed {
            path: path.clone(),
            source,
        })?;
        debug!(file = %path.display(), "wrote generated source");
    }

    Ok(files)
}
