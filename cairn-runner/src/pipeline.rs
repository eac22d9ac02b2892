//! Pipeline orchestration
//!
//! A `Pipeline` is the fixed, ordered list of phases for one operation.
//! Starting it against an execution context yields a `PipelineRun` which owns
//! that context and walks the phases strictly in order:
//! - A successful phase is recorded and the run moves on
//! - A failing mandatory phase is recorded and the run stops as `Failed`
//! - A failing optional phase is recorded and the run continues; it ends as
//!   `PartiallyFailed` if nothing mandatory failed
//! - Cancellation is checked before each phase; once observed no new phase
//!   starts and the run ends as `Cancelled`
//!
//! There is no rollback. Recovering from a failed run means starting a new
//! run with a fresh context.

use cairn_core::domain::pipeline::{PhaseReport, PhaseStatus, PipelineReport, PipelineStatus};
use cairn_core::{Error, Result};
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cancel::CancellationToken;
use crate::context::ExecutionContext;
use crate::phases::Phase;
use crate::playbook::PlaybookExecutor;

struct PipelineEntry {
    phase: Box<dyn Phase>,
    optional: bool,
}

/// Ordered phases of one operation
pub struct Pipeline {
    operation: String,
    entries: Vec<PipelineEntry>,
    continue_on_error: bool,
}

impl Pipeline {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            entries: Vec::new(),
            continue_on_error: false,
        }
    }

    /// Appends a mandatory phase
    pub fn phase(mut self, phase: impl Phase + 'static) -> Self {
        self.push(Box::new(phase), false);
        self
    }

    /// Appends a phase whose failure does not stop the run
    pub fn optional_phase(mut self, phase: impl Phase + 'static) -> Self {
        self.push(Box::new(phase), true);
        self
    }

    pub fn push(&mut self, phase: Box<dyn Phase>, optional: bool) {
        self.entries.push(PipelineEntry { phase, optional });
    }

    /// Makes every phase best-effort
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.phase.name()).collect()
    }

    /// Phases with their optional flag and playbooks, in execution order
    pub fn describe(&self) -> Vec<(&str, bool, &[&'static str])> {
        self.entries
            .iter()
            .map(|e| (e.phase.name(), e.optional, e.phase.playbooks()))
            .collect()
    }

    /// Checks that phase names are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.phase_names() {
            if !seen.insert(name) {
                return Err(Error::configuration(
                    name,
                    format!("phase appears more than once in pipeline '{}'", self.operation),
                ));
            }
        }
        Ok(())
    }

    /// Starts a run that takes ownership of the context
    pub fn start(&self, ctx: ExecutionContext) -> Result<PipelineRun<'_>> {
        self.validate()?;
        let artifact_prefix = format!("{}-{}-{}", ctx.cluster(), self.operation, ctx.run_id());
        Ok(PipelineRun {
            pipeline: self,
            ctx,
            status: watch::Sender::new(PipelineStatus::Pending),
            artifact_prefix,
        })
    }

    /// Runs the pipeline to completion with default artifact naming
    pub async fn run(
        &self,
        ctx: ExecutionContext,
        executor: &dyn PlaybookExecutor,
    ) -> Result<PipelineReport> {
        Ok(self.start(ctx)?.execute(executor).await)
    }
}

/// One execution of a pipeline
pub struct PipelineRun<'a> {
    pipeline: &'a Pipeline,
    ctx: ExecutionContext,
    status: watch::Sender<PipelineStatus>,
    artifact_prefix: String,
}

impl<'a> PipelineRun<'a> {
    /// Sets the prefix of the per-phase artifact names
    ///
    /// Phase artifacts are named `<prefix>-<NN>-<phase>.log`.
    pub fn with_artifact_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.artifact_prefix = prefix.into();
        self
    }

    pub fn status(&self) -> PipelineStatus {
        *self.status.borrow()
    }

    /// Receiver that follows the run's status while it executes
    pub fn watch_status(&self) -> watch::Receiver<PipelineStatus> {
        self.status.subscribe()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Token that cancels this run from another task
    pub fn cancellation(&self) -> CancellationToken {
        self.ctx.cancellation()
    }

    pub fn artifact_name(&self, index: usize, phase: &str) -> String {
        format!("{}-{:02}-{}.log", self.artifact_prefix, index + 1, phase)
    }

    /// Executes the phases in order and returns the ordered report
    pub async fn execute(mut self, executor: &dyn PlaybookExecutor) -> PipelineReport {
        let pipeline = self.pipeline;
        let started_at = Utc::now();
        self.status.send_replace(PipelineStatus::Running);

        info!(
            run_id = %self.ctx.run_id(),
            cluster = self.ctx.cluster(),
            operation = %pipeline.operation,
            phases = pipeline.len(),
            "Starting pipeline"
        );

        let mut reports = Vec::with_capacity(pipeline.len());
        let mut mandatory_failed = false;
        let mut optional_failed = false;
        let mut cancelled = false;

        for (index, entry) in pipeline.entries.iter().enumerate() {
            let name = entry.phase.name();

            if self.ctx.is_cancelled() {
                warn!(phase = name, "Run cancelled, not starting remaining phases");
                cancelled = true;
                break;
            }

            let artifact = self.artifact_name(index, name);
            info!(
                phase = name,
                step = index + 1,
                optional = entry.optional,
                artifact = %artifact,
                "Starting phase"
            );

            let outcome = entry.phase.run(&mut self.ctx, executor, &artifact).await;
            let report = PhaseReport::from_outcome(name, entry.optional, outcome);

            match report.status {
                PhaseStatus::Succeeded => {
                    info!(phase = name, "Phase completed successfully");
                    reports.push(report);
                }
                PhaseStatus::Cancelled => {
                    warn!(phase = name, "Phase cancelled");
                    reports.push(report);
                    cancelled = true;
                    break;
                }
                PhaseStatus::Failed | PhaseStatus::TimedOut => {
                    let message = report.error.clone().unwrap_or_default();
                    if entry.optional || pipeline.continue_on_error {
                        warn!(phase = name, "Phase failed, continuing: {}", message);
                        reports.push(report);
                        optional_failed = true;
                    } else {
                        error!(phase = name, "Phase failed: {}", message);
                        reports.push(report);
                        mandatory_failed = true;
                        break;
                    }
                }
            }
        }

        let status = if cancelled {
            PipelineStatus::Cancelled
        } else if mandatory_failed {
            PipelineStatus::Failed
        } else if optional_failed {
            PipelineStatus::PartiallyFailed
        } else {
            PipelineStatus::Succeeded
        };
        self.status.send_replace(status);

        info!(
            run_id = %self.ctx.run_id(),
            operation = %pipeline.operation,
            status = %status,
            executed = reports.len(),
            "Pipeline finished"
        );

        PipelineReport {
            run_id: self.ctx.run_id(),
            operation: pipeline.operation.clone(),
            cluster: self.ctx.cluster().to_string(),
            status,
            phases: reports,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
