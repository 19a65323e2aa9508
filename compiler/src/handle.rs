use crate::{
    backend::ParseBackend,
    config::ExecutionStrategy,
    decoder::{decode, is_success},
    error::{FlatJsonError, ParseError},
    protocol::{WireProtocol, FAILURE_SENTINEL},
    traits::FlatRecord,
    verifier::{Field, ValidatedSchema},
};
use brine_flatjson_schema::ParsedRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};

/// The on-disk product of one build: the workspace holding the generated
/// sources and the compiled executable.
#[derive(Debug)]
pub struct Artifact {
    pub(crate) workspace:  TempDir,
    pub(crate) executable: PathBuf,
}

impl Artifact {
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Removes every file of the artifact, logging each one, then the workspace itself.
    fn remove(self) -> io::Result<()> {
        if let Ok(entries) = fs::read_dir(self.workspace.path()) {
            for entry in entries.flatten() {
                let path = entry.path();
                match fs::remove_file(&path) {
                    Ok(())   => info!(file = %path.display(), "removed file"),
                    Err(err) => warn!(file = %path.display(), %err, "failed to remove file"),
                }
            }
        }
        self.workspace.close()
    }
}

enum State {
    Ready {
        artifact: Artifact,
        backend:  Box<dyn ParseBackend>,
    },
    Closed,
}

/// A parser built for one record schema.
///
/// `parse` may be called from many threads at once. `close` waits for
/// in-flight calls to finish before it deletes the artifact; afterwards every
/// `parse` fails with [`ParseError::Closed`]. Dropping the parser closes it.
pub struct CompiledParser {
    schema:   ValidatedSchema,
    protocol: WireProtocol,
    timeout:  RwLock<Option<Duration>>,
    state:    RwLock<State>,
}

impl CompiledParser {
    pub(crate) fn new(
        schema:   ValidatedSchema,
        protocol: WireProtocol,
        timeout:  Option<Duration>,
        artifact: Artifact,
        backend:  Box<dyn ParseBackend>,
    ) -> CompiledParser {
        CompiledParser {
            schema,
            protocol,
            timeout: RwLock::new(timeout),
            state:   RwLock::new(State::Ready { artifact, backend }),
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn fields(&self) -> &[Field] {
        self.schema.fields()
    }

    pub fn schema(&self) -> &ValidatedSchema {
        &self.schema
    }

    pub fn protocol(&self) -> WireProtocol {
        self.protocol
    }

    pub fn strategy(&self) -> Option<ExecutionStrategy> {
        match &*self.read_state() {
            State::Ready { backend, .. } => Some(backend.strategy()),
            State::Closed                => None,
        }
    }

    /// Path of the compiled executable, `None` once closed.
    pub fn executable(&self) -> Option<PathBuf> {
        match &*self.read_state() {
            State::Ready { artifact, .. } => Some(artifact.executable().to_path_buf()),
            State::Closed                 => None,
        }
    }

    /// Workspace directory holding sources and executable, `None` once closed.
    pub fn workspace(&self) -> Option<PathBuf> {
        match &*self.read_state() {
            State::Ready { artifact, .. } => Some(artifact.workspace().to_path_buf()),
            State::Closed                 => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout.read() {
            Ok(guard)     => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        match self.timeout.write() {
            Ok(mut guard) => *guard = timeout,
            Err(poisoned) => *poisoned.into_inner() = timeout,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(&*self.read_state(), State::Closed)
    }

    /// Runs the compiled parser on one JSON document.
    pub fn parse(&self, document: &str) -> Result<ParsedRecord, ParseError> {
        let timeout = self.timeout();
        let state = self.read_state();
        let backend = match &*state {
            State::Ready { backend, .. } => backend,
            State::Closed                => return Err(ParseError::Closed),
        };

        let output = backend.run(document, timeout)?;
        drop(state);

        if !is_success(&output) && output.contains(FAILURE_SENTINEL) {
            return Err(ParseError::Rejected { output: output.trim().to_string() });
        }
        Ok(decode(&self.schema, &output, self.protocol)?)
    }

    /// Parses `document` and reads the record into `T`.
    pub fn parse_into<T: FlatRecord>(&self, document: &str) -> Result<T, FlatJsonError> {
        let record = self.parse(document)?;
        T::from_record(&record)
    }

    /// Stops the backend and deletes the artifact. Calling it again is a no-op.
    pub fn close(&self) -> io::Result<()> {
        let previous = {
            let mut state = self.write_state();
            std::mem::replace(&mut *state, State::Closed)
        };

        match previous {
            State::Ready { artifact, backend } => {
                backend.shutdown();
                let workspace = artifact.workspace().to_path_buf();
                artifact.remove()?;
                info!(record = %self.schema.name(), workspace = %workspace.display(), "closed parser");
                Ok(())
            }
            State::Closed => Ok(()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CompiledParser {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(record = %self.schema.name(), %err, "failed to clean up parser artifact");
        }
    }
}

impl std::fmt::Debug for CompiledParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledParser")
            .field("name", &self.schema.name())
            .field("protocol", &self.protocol)
            .field("executable", &self.executable())
            .finish()
    }
}
