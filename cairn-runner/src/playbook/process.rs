//! Engine process runner
//!
//! Handles one automation engine invocation:
//! - Resolving the selected playbook through the catalog
//! - Opening the artifact in append mode
//! - Spawning the engine with facts as `--extra-vars` and the inventory as `-i`
//! - Streaming stdout and stderr into the artifact line by line
//! - Enforcing the timeout and reacting to cancellation by killing the engine
//! - Parsing the per-target recap once the engine is done

use async_trait::async_trait;
use cairn_core::domain::playbook::PlaybookSelection;
use cairn_core::domain::result::{PlaybookResult, RunStatus, TargetStatus};
use cairn_core::{Error, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{PlaybookCatalog, PlaybookExecutor, RecapParser};
use crate::config::RunnerConfig;
use crate::context::ExecutionContext;

/// How an engine invocation ended
enum Termination {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

/// Runs playbooks through the external automation engine
pub struct EngineRunner {
    config: RunnerConfig,
    catalog: PlaybookCatalog,
}

impl EngineRunner {
    /// Creates a runner for the given configuration and catalog
    pub fn new(config: RunnerConfig, catalog: PlaybookCatalog) -> Self {
        Self { config, catalog }
    }

    /// Creates a runner whose catalog holds every bundled playbook under
    /// the configured playbook directory
    pub fn with_bundled_playbooks(config: RunnerConfig) -> Self {
        let catalog = PlaybookCatalog::bundled(&config.playbook_dir);
        Self::new(config, catalog)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PlaybookCatalog {
        &self.catalog
    }

    /// Resolves an artifact name against the artifact directory
    ///
    /// Absolute paths are used as given.
    pub fn artifact_path(&self, artifact: &str) -> PathBuf {
        let path = Path::new(artifact);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.artifact_dir.join(path)
        }
    }

    fn build_command(
        &self,
        ctx: &ExecutionContext,
        selection: &PlaybookSelection,
        playbook_path: &Path,
    ) -> Command {
        let mut command = Command::new(&self.config.engine);
        command
            .args(&self.config.engine_args)
            .arg("-i")
            .arg(ctx.inventory().to_engine_arg())
            .arg("--extra-vars")
            .arg(ctx.facts().to_json());

        if let Some(tag) = &selection.tag {
            command.arg("--tags").arg(tag);
        }

        command
            .arg(playbook_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so termination reaches the engine's workers too
        #[cfg(unix)]
        command.process_group(0);

        command
    }

    /// Waits for the engine to exit, time out or be cancelled
    async fn wait(&self, child: &mut Child, ctx: &ExecutionContext) -> Termination {
        let cancellation = ctx.cancellation();

        match ctx.timeout().or(self.config.timeout) {
            Some(limit) => tokio::select! {
                biased;
                status = child.wait() => Termination::Exited(status),
                _ = cancellation.cancelled() => Termination::Cancelled,
                _ = tokio::time::sleep(limit) => Termination::TimedOut(limit),
            },
            None => tokio::select! {
                biased;
                status = child.wait() => Termination::Exited(status),
                _ = cancellation.cancelled() => Termination::Cancelled,
            },
        }
    }

    /// Gives the output readers a bounded time to reach end of stream
    ///
    /// Processes forked by the engine can keep the pipes open after the
    /// engine itself is gone; readers still running after the grace period
    /// are aborted.
    async fn drain_readers(&self, readers: Vec<JoinHandle<()>>) {
        let deadline = tokio::time::Instant::now() + self.config.drain_grace;
        for mut reader in readers {
            if tokio::time::timeout_at(deadline, &mut reader).await.is_err() {
                debug!("Engine output still open after grace period, abandoning reader");
                reader.abort();
            }
        }
    }
}

#[async_trait]
impl PlaybookExecutor for EngineRunner {
    async fn execute(&self, ctx: &ExecutionContext, artifact: &str) -> Result<PlaybookResult> {
        let selection = ctx
            .selected_playbook()
            .ok_or_else(|| Error::UnknownPlaybook("no playbook selected".to_string()))?;
        let playbook_path = self.catalog.resolve(&selection.id)?;

        let artifact_path = self.artifact_path(artifact);
        let file = open_artifact(&artifact_path).await?;

        let mut command = self.build_command(ctx, selection, playbook_path);

        info!(
            run_id = %ctx.run_id(),
            cluster = ctx.cluster(),
            playbook = %selection.id,
            artifact = %artifact_path.display(),
            "Starting playbook"
        );

        let started_at = Utc::now();
        let mut child = command.spawn().map_err(|source| Error::EngineUnavailable {
            program: self.config.engine.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
        }
        let writer = tokio::spawn(write_artifact(file, rx));

        let (status, exit_code, marker) = match self.wait(&mut child, ctx).await {
            Termination::Exited(Ok(exit)) => {
                let status = if exit.success() {
                    RunStatus::Succeeded
                } else {
                    RunStatus::Failed
                };
                (status, exit.code(), None)
            }
            Termination::Exited(Err(e)) => {
                error!("Failed to wait for engine process: {}", e);
                terminate(&mut child).await;
                (
                    RunStatus::Failed,
                    None,
                    Some(format!("[cairn] lost track of engine process: {}", e)),
                )
            }
            Termination::TimedOut(limit) => {
                warn!(
                    playbook = %selection.id,
                    "Playbook exceeded timeout of {:?}, terminating engine",
                    limit
                );
                terminate(&mut child).await;
                (
                    RunStatus::Timeout,
                    None,
                    Some(format!(
                        "[cairn] engine terminated after exceeding timeout of {}s",
                        limit.as_secs_f64()
                    )),
                )
            }
            Termination::Cancelled => {
                warn!(playbook = %selection.id, "Run cancelled, terminating engine");
                terminate(&mut child).await;
                (
                    RunStatus::Cancelled,
                    None,
                    Some("[cairn] engine terminated: run cancelled".to_string()),
                )
            }
        };

        self.drain_readers(readers).await;
        if let Some(marker) = marker {
            let _ = tx.send(marker);
        }
        drop(tx);

        let (written, per_target) = match writer.await {
            Ok(outcome) => outcome,
            Err(e) => (Err(std::io::Error::other(e.to_string())), BTreeMap::new()),
        };

        let result = PlaybookResult {
            playbook: selection.id.clone(),
            status,
            exit_code,
            per_target,
            artifact: artifact_path,
            started_at,
            finished_at: Utc::now(),
        };

        if let Err(source) = written {
            error!("Artifact write failed, engine outcome was: {}", result);
            return Err(Error::ArtifactWrite {
                path: result.artifact,
                source,
            });
        }

        if result.is_success() {
            info!(
                playbook = %result.playbook,
                targets = result.per_target.len(),
                "Playbook completed successfully"
            );
        } else {
            warn!("Playbook did not succeed: {}", result);
        }

        Ok(result)
    }
}

/// Creates (or reopens for appending) the artifact file
///
/// Artifacts are never truncated, so output from earlier invocations under
/// the same name survives.
async fn open_artifact(path: &Path) -> Result<File> {
    let to_error = |source: std::io::Error| Error::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(to_error)
}

/// Kills the engine together with every process in its group
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("Failed to signal engine process group {}: {}", pid, e);
        }
    }

    if let Err(e) = child.kill().await {
        warn!("Failed to kill engine process: {}", e);
    }
}

/// Forwards output lines from one pipe to the artifact writer
///
/// Reads raw bytes so non UTF-8 output never stalls the pipe.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Stopped reading engine output: {}", e);
                break;
            }
        }
    }
}

/// Appends every received line to the artifact and feeds the recap parser
///
/// Keeps draining the channel after a write error so the engine never
/// blocks on a full pipe.
async fn write_artifact(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> (std::io::Result<()>, BTreeMap<String, TargetStatus>) {
    let mut recap = RecapParser::new();
    let mut written = Ok(());

    while let Some(line) = rx.recv().await {
        recap.feed(&line);
        if written.is_ok() {
            written = write_line(&mut file, &line).await;
        }
    }

    if written.is_ok() {
        written = file.flush().await;
    }

    (written, recap.finish())
}

async fn write_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
