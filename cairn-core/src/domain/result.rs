//! Playbook run results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Overall status of one engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    Failed,
    /// The invocation exceeded its timeout and the engine was killed
    Timeout,
    /// The run was cancelled while the engine was running
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed => write!(f, "Failed"),
            RunStatus::Timeout => write!(f, "Timeout"),
            RunStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Outcome for a single target host, as reported by the engine's recap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Result of one playbook invocation
///
/// Immutable once returned by the runner. The artifact holds the engine's
/// native output stream for this invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookResult {
    pub playbook: String,
    pub status: RunStatus,
    /// Exit code of the engine, absent when it was killed
    pub exit_code: Option<i32>,
    pub per_target: BTreeMap<String, TargetStatus>,
    pub artifact: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PlaybookResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Targets the engine reported as failed or unreachable
    pub fn failed_targets(&self) -> Vec<&str> {
        self.per_target
            .iter()
            .filter(|(_, status)| **status == TargetStatus::Failed)
            .map(|(target, _)| target.as_str())
            .collect()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Converts a non-successful result into the matching error
    ///
    /// Failed runs become `Error::Execution`, timed out runs `Error::Timeout`
    /// and cancelled runs `Error::Cancelled`. The result travels inside the
    /// error so callers keep the exit status and artifact location.
    pub fn into_checked(self) -> Result<Self> {
        match self.status {
            RunStatus::Succeeded => Ok(self),
            RunStatus::Failed => Err(Error::Execution(Box::new(self))),
            RunStatus::Timeout => Err(Error::Timeout(Box::new(self))),
            RunStatus::Cancelled => Err(Error::Cancelled(Box::new(self))),
        }
    }
}

impl std::fmt::Display for PlaybookResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "playbook '{}' {}", self.playbook, self.status)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit code {})", code)?;
        }
        let failed = self.failed_targets();
        if !failed.is_empty() {
            write!(f, ", failed targets: {}", failed.join(", "))?;
        }
        write!(f, ", output in {}", self.artifact.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(status: RunStatus, exit_code: Option<i32>) -> PlaybookResult {
        let mut per_target = BTreeMap::new();
        per_target.insert("master-1".to_string(), TargetStatus::Succeeded);
        per_target.insert("worker-1".to_string(), TargetStatus::Failed);
        per_target.insert("worker-2".to_string(), TargetStatus::Skipped);

        PlaybookResult {
            playbook: "01-base.yml".to_string(),
            status,
            exit_code,
            per_target,
            artifact: PathBuf::from("/var/log/cairn/run-01-Base.log"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_failed_targets() {
        let result = result_with(RunStatus::Failed, Some(2));
        assert_eq!(result.failed_targets(), vec!["worker-1"]);
    }

    #[test]
    fn test_into_checked() {
        assert!(result_with(RunStatus::Succeeded, Some(0)).into_checked().is_ok());
        assert!(matches!(
            result_with(RunStatus::Failed, Some(2)).into_checked(),
            Err(Error::Execution(_))
        ));
        assert!(matches!(
            result_with(RunStatus::Timeout, None).into_checked(),
            Err(Error::Timeout(_))
        ));
        assert!(matches!(
            result_with(RunStatus::Cancelled, None).into_checked(),
            Err(Error::Cancelled(_))
        ));
    }

    #[test]
    fn test_display() {
        let result = result_with(RunStatus::Failed, Some(2));
        assert_eq!(
            result.to_string(),
            "playbook '01-base.yml' Failed (exit code 2), failed targets: worker-1, output in /var/log/cairn/run-01-Base.log"
        );
    }
}
