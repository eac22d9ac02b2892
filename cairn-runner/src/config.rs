//! Runner configuration
//!
//! Defines how the external automation engine is launched: which executable,
//! where playbooks live, where artifacts are written and how long a single
//! invocation may run.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// Engine runner configuration
///
/// Passed explicitly to the runner at construction so tests can point it at a
/// fake engine and a temporary playbook tree.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Engine executable (e.g., "ansible-playbook")
    pub engine: String,

    /// Extra arguments placed before the generated ones (e.g., "-v")
    pub engine_args: Vec<String>,

    /// Directory holding the playbook files
    pub playbook_dir: PathBuf,

    /// Directory relative artifact names are resolved against
    pub artifact_dir: PathBuf,

    /// Default bound on a single engine invocation, `None` for unbounded
    pub timeout: Option<Duration>,

    /// How long to keep draining output after the engine has been killed
    pub drain_grace: Duration,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(engine: String, playbook_dir: PathBuf) -> Self {
        Self {
            engine,
            engine_args: Vec::new(),
            playbook_dir,
            artifact_dir: PathBuf::from("/var/lib/cairn/artifacts"),
            timeout: Some(Duration::from_secs(2 * 60 * 60)),
            drain_grace: Duration::from_secs(5),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CAIRN_PLAYBOOK_DIR (required)
    /// - CAIRN_ENGINE (optional, default: ansible-playbook)
    /// - CAIRN_ENGINE_ARGS (optional, whitespace separated)
    /// - CAIRN_ARTIFACT_DIR (optional, default: /var/lib/cairn/artifacts)
    /// - CAIRN_TIMEOUT (optional, seconds, 0 disables, default: 7200)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates configuration from the variables `lookup` returns
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let playbook_dir = lookup("CAIRN_PLAYBOOK_DIR")
            .ok_or_else(|| anyhow::anyhow!("CAIRN_PLAYBOOK_DIR environment variable not set"))?;

        let engine = lookup("CAIRN_ENGINE").unwrap_or_else(|| "ansible-playbook".to_string());

        let mut config = Self::new(engine, PathBuf::from(playbook_dir));

        if let Some(args) = lookup("CAIRN_ENGINE_ARGS") {
            config.engine_args = args.split_whitespace().map(str::to_string).collect();
        }

        if let Some(dir) = lookup("CAIRN_ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(dir);
        }

        if let Some(secs) = lookup("CAIRN_TIMEOUT") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("CAIRN_TIMEOUT must be a number of seconds, got '{}'", secs))?;
            config.timeout = timeout_from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_engine_args(mut self, args: Vec<String>) -> Self {
        self.engine_args = args;
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine.trim().is_empty() {
            anyhow::bail!("engine cannot be empty");
        }

        if self.playbook_dir.as_os_str().is_empty() {
            anyhow::bail!("playbook_dir cannot be empty");
        }

        if self.artifact_dir.as_os_str().is_empty() {
            anyhow::bail!("artifact_dir cannot be empty");
        }

        if self.timeout == Some(Duration::ZERO) {
            anyhow::bail!("timeout must be greater than 0 (use no timeout instead)");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(
            "ansible-playbook".to_string(),
            PathBuf::from("/opt/cairn/playbooks"),
        )
    }
}

/// Maps a seconds value to a timeout, treating 0 as "no timeout"
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}
