use crate::protocol::WireProtocol;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_COMPILER: &str = "cc";

/// How a built parser runs its artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Spawn the artifact once per document, passing it as the only argument.
    #[default]
    ProcessPerCall,
    /// Keep one artifact running in `--serve` mode and stream documents to it.
    Worker,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStrategy::ProcessPerCall => f.write_str("process"),
            ExecutionStrategy::Worker         => f.write_str("worker"),
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<ExecutionStrategy, String> {
        match s {
            "process" | "process-per-call" => Ok(ExecutionStrategy::ProcessPerCall),
            "worker"                       => Ok(ExecutionStrategy::Worker),
            other => Err(format!("unknown execution strategy \"{}\" (expected process or worker)", other)),
        }
    }
}

/// Everything the builder needs besides the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// C compiler executable.
    pub compiler:       String,
    /// Flags passed before `-o`.
    pub cflags:         Vec<String>,
    /// Parent of the per-build workspace; the system temp dir when `None`.
    pub workspace_root: Option<PathBuf>,
    pub strategy:       ExecutionStrategy,
    pub protocol:       WireProtocol,
    /// Upper bound on one artifact invocation.
    pub timeout:        Option<Duration>,
}

impl Default for BuildOptions {
    fn default() -> BuildOptions {
        BuildOptions {
            compiler:       env::var("CC").ok().filter(|cc| !cc.trim().is_empty()).unwrap_or_else(|| DEFAULT_COMPILER.to_string()),
            cflags:         vec!["-O2".to_string()],
            workspace_root: None,
            strategy:       ExecutionStrategy::default(),
            protocol:       WireProtocol::default(),
            timeout:        None,
        }
    }
}

impl BuildOptions {
    /// Defaults, overridden by `BFJ_CFLAGS`, `BFJ_STRATEGY`, `BFJ_PROTOCOL`
    /// and `BFJ_TIMEOUT_MS`. Unparseable values are logged and ignored.
    pub fn from_env() -> BuildOptions {
        let mut options = BuildOptions::default();

        if let Ok(flags) = env::var("BFJ_CFLAGS") {
            options.cflags = flags.split_whitespace().map(str::to_string).collect();
        }
        if let Ok(strategy) = env::var("BFJ_STRATEGY") {
            match strategy.parse() {
                Ok(strategy) => options.strategy = strategy,
                Err(err)     => warn!(%err, "ignoring BFJ_STRATEGY"),
            }
        }
        if let Ok(protocol) = env::var("BFJ_PROTOCOL") {
            match protocol.parse() {
                Ok(protocol) => options.protocol = protocol,
                Err(err)     => warn!(%err, "ignoring BFJ_PROTOCOL"),
            }
        }
        if let Ok(timeout) = env::var("BFJ_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms)   => options.timeout = Some(Duration::from_millis(ms)),
                Err(err) => warn!(%err, value = %timeout, "ignoring BFJ_TIMEOUT_MS"),
            }
        }

        options
    }

    pub fn compiler(mut self, compiler: impl Into<String>) -> BuildOptions {
        self.compiler = compiler.into();
        self
    }

    pub fn cflags<I, S>(mut self, flags: I) -> BuildOptions
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cflags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> BuildOptions {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> BuildOptions {
        self.strategy = strategy;
        self
    }

    pub fn protocol(mut self, protocol: WireProtocol) -> BuildOptions {
        self.protocol = protocol;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> BuildOptions {
        self.timeout = Some(timeout);
        self
    }
}
