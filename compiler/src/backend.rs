//! Ways of running a built parser artifact on one document.

use crate::{
    config::ExecutionStrategy,
    error::ParseError,
    protocol::SERVE_FLAG,
};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const WORKER_EXIT_GRACE: Duration = Duration::from_millis(500);

/// Runs a compiled parser on a document and returns everything it printed.
///
/// Implementations are shared between threads; interpreting the output is
/// left to the caller.
pub trait ParseBackend: Send + Sync {
    fn run(&self, document: &str, timeout: Option<Duration>) -> Result<String, ParseError>;

    /// Releases anything the backend keeps alive between calls.
    fn shutdown(&self) {}

    fn strategy(&self) -> ExecutionStrategy;
}

pub fn backend_for(strategy: ExecutionStrategy, executable: PathBuf) -> Box<dyn ParseBackend> {
    match strategy {
        ExecutionStrategy::ProcessPerCall => Box::new(ProcessPerCall::new(executable)),
        ExecutionStrategy::Worker         => Box::new(PersistentWorker::new(executable)),
    }
}

/// One process per document, the document passed as the sole argument.
#[derive(Debug)]
pub struct ProcessPerCall {
    executable: PathBuf,
}

impl ProcessPerCall {
    pub fn new(executable: PathBuf) -> ProcessPerCall {
        ProcessPerCall { executable }
    }
}

impl ParseBackend for ProcessPerCall {
    fn run(&self, document: &str, timeout: Option<Duration>) -> Result<String, ParseError> {
        let child = Command::new(&self.executable)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ParseError::ProcessSpawnFailed)?;

        let output = match timeout {
            None => {
                let output = child.wait_with_output()?;
                combine(output.stdout, output.stderr)
            }
            Some(limit) => wait_with_deadline(child, limit)?,
        };
        trace!(output = %output, "parser output");
        Ok(output)
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::ProcessPerCall
    }
}

fn combine(mut stdout: Vec<u8>, stderr: Vec<u8>) -> String {
    stdout.extend_from_slice(&stderr);
    String::from_utf8_lossy(&stdout).into_owned()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Waits for `child` while its pipes are drained on helper threads, killing it
/// once `limit` has passed.
fn wait_with_deadline(mut child: Child, limit: Duration) -> Result<String, ParseError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let start = Instant::now();

    loop {
        if child.try_wait()?.is_some() {
            break;
        }
        if start.elapsed() >= limit {
            warn!(pid = child.id(), ?limit, "parser exceeded its deadline, killing it");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ParseError::Timeout(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    Ok(combine(stdout, stderr))
}

/// One long-lived artifact in `--serve` mode. Requests are serialized; a
/// worker that dies or times out is replaced on the next call.
#[derive(Debug)]
pub struct PersistentWorker {
    executable: PathBuf,
    worker:     Mutex<Option<Worker>>,
}

impl PersistentWorker {
    pub fn new(executable: PathBuf) -> PersistentWorker {
        PersistentWorker {
            executable,
            worker: Mutex::new(None),
        }
    }

    /// Pid of the running worker, if one is up.
    pub fn worker_pid(&self) -> Option<u32> {
        self.worker
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|w| w.child.id()))
    }
}

impl ParseBackend for PersistentWorker {
    fn run(&self, document: &str, timeout: Option<Duration>) -> Result<String, ParseError> {
        let mut guard = self
            .worker
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "parser worker lock poisoned"))?;

        if guard.is_none() {
            *guard = Some(Worker::spawn(&self.executable)?);
        }
        let result = match guard.as_mut() {
            Some(worker) => worker.request(document, timeout),
            None         => Err(ParseError::Closed),
        };

        if result.is_err() {
            // Whatever state the worker is in, it cannot be trusted with the next frame.
            *guard = None;
        }
        result
    }

    fn shutdown(&self) {
        match self.worker.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Worker
    }
}

#[derive(Debug)]
struct Worker {
    child:     Child,
    stdin:     Option<ChildStdin>,
    responses: Receiver<io::Result<String>>,
    reader:    Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(executable: &Path) -> Result<Worker, ParseError> {
        let mut child = Command::new(executable)
            .arg(SERVE_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ParseError::ProcessSpawnFailed)?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "parser worker has no stdout"))?;

        let (tx, responses) = mpsc::channel();
        let reader = thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                match read_frame(&mut reader) {
                    Ok(Some(payload)) => {
                        if tx.send(Ok(payload)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(err));
                        break;
                    }
                }
            }
        });

        debug!(pid = child.id(), executable = %executable.display(), "started parser worker");
        Ok(Worker {
            child,
            stdin,
            responses,
            reader: Some(reader),
        })
    }

    fn request(&mut self, document: &str, timeout: Option<Duration>) -> Result<String, ParseError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "parser worker stdin closed"))?;
        writeln!(stdin, "{}", document.len())?;
        stdin.write_all(document.as_bytes())?;
        stdin.flush()?;

        let response = match timeout {
            None => self.responses.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(limit) => self.responses.recv_timeout(limit),
        };

        match response {
            Ok(Ok(payload)) => {
                trace!(output = %payload, "parser worker output");
                Ok(payload)
            }
            Ok(Err(err)) => Err(ParseError::Io(err)),
            Err(RecvTimeoutError::Timeout) => {
                let limit = timeout.unwrap_or_default();
                warn!(pid = self.child.id(), ?limit, "parser worker exceeded its deadline, killing it");
                let _ = self.child.kill();
                Err(ParseError::Timeout(limit))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ParseError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "parser worker exited",
            ))),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing stdin asks the worker to exit on its own.
        drop(self.stdin.take());

        let start = Instant::now();
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if start.elapsed() < WORKER_EXIT_GRACE => thread::sleep(POLL_INTERVAL),
                _ => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        debug!(pid = self.child.id(), "stopped parser worker");
    }
}

/// Reads one `<length>\n<payload>` frame. `Ok(None)` on a clean EOF.
fn read_frame<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Ok(None);
    }
    let length: usize = header.trim().parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad frame header {:?} from parser worker", header),
        )
    })?;

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
}
