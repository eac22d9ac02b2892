//! Test doubles shared by the phase and pipeline tests

use async_trait::async_trait;
use cairn_core::domain::fact::FactStore;
use cairn_core::domain::result::{PlaybookResult, RunStatus};
use cairn_core::{Error, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::context::ExecutionContext;
use crate::playbook::PlaybookExecutor;

/// One call observed by the recording executor
#[derive(Debug, Clone)]
pub struct Invocation {
    pub playbook: String,
    pub tag: Option<String>,
    pub facts: FactStore,
    pub artifact: String,
}

/// Executor that records every invocation instead of spawning an engine
///
/// Playbooks succeed unless configured otherwise.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Invocation>>,
    outcomes: Mutex<HashMap<String, RunStatus>>,
    cancel_after: Mutex<HashSet<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every invocation of `playbook` end with `status`
    pub fn respond(self, playbook: &str, status: RunStatus) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(playbook.to_string(), status);
        self
    }

    /// Cancels the run once `playbook` has finished
    pub fn cancel_after(self, playbook: &str) -> Self {
        self.cancel_after
            .lock()
            .unwrap()
            .insert(playbook.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn playbooks(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.playbook).collect()
    }
}

#[async_trait]
impl PlaybookExecutor for RecordingExecutor {
    async fn execute(&self, ctx: &ExecutionContext, artifact: &str) -> Result<PlaybookResult> {
        let selection = ctx
            .selected_playbook()
            .ok_or_else(|| Error::UnknownPlaybook("no playbook selected".to_string()))?;

        self.calls.lock().unwrap().push(Invocation {
            playbook: selection.id.clone(),
            tag: selection.tag.clone(),
            facts: ctx.facts().clone(),
            artifact: artifact.to_string(),
        });

        let status = self
            .outcomes
            .lock()
            .unwrap()
            .get(&selection.id)
            .copied()
            .unwrap_or(RunStatus::Succeeded);

        if self.cancel_after.lock().unwrap().contains(&selection.id) {
            ctx.cancellation().cancel();
        }

        let now = Utc::now();
        Ok(PlaybookResult {
            playbook: selection.id.clone(),
            status,
            exit_code: match status {
                RunStatus::Succeeded => Some(0),
                RunStatus::Failed => Some(2),
                _ => None,
            },
            per_target: BTreeMap::new(),
            artifact: PathBuf::from("/tmp/cairn-test").join(artifact),
            started_at: now,
            finished_at: now,
        })
    }
}
