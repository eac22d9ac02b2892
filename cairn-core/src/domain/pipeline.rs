//! Pipeline domain types
//!
//! The report returned to the caller once a pipeline run ends. Translating it
//! into persistence, notifications or audit entries is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::domain::result::PlaybookResult;
use crate::error::Error;

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Pending,
    Running,
    /// Every phase succeeded
    Succeeded,
    /// A mandatory phase failed
    Failed,
    /// Only optional phases failed
    PartiallyFailed,
    /// The run was cancelled before it could finish
    Cancelled,
}

impl PipelineStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Pending | PipelineStatus::Running)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStatus::Pending => write!(f, "Pending"),
            PipelineStatus::Running => write!(f, "Running"),
            PipelineStatus::Succeeded => write!(f, "Succeeded"),
            PipelineStatus::Failed => write!(f, "Failed"),
            PipelineStatus::PartiallyFailed => write!(f, "PartiallyFailed"),
            PipelineStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Outcome of a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl PhaseStatus {
    pub fn is_success(&self) -> bool {
        *self == PhaseStatus::Succeeded
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseStatus::Succeeded => write!(f, "Succeeded"),
            PhaseStatus::Failed => write!(f, "Failed"),
            PhaseStatus::TimedOut => write!(f, "TimedOut"),
            PhaseStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Record of one executed phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: String,
    pub optional: bool,
    pub status: PhaseStatus,
    /// Present whenever the engine was invoked
    pub result: Option<PlaybookResult>,
    pub error: Option<String>,
}

impl PhaseReport {
    /// Builds the report from the phase's outcome
    pub fn from_outcome(
        phase: impl Into<String>,
        optional: bool,
        outcome: std::result::Result<PlaybookResult, Error>,
    ) -> Self {
        let phase = phase.into();
        match outcome {
            Ok(result) => Self {
                phase,
                optional,
                status: PhaseStatus::Succeeded,
                result: Some(result),
                error: None,
            },
            Err(err) => {
                let status = match &err {
                    Error::Timeout(_) => PhaseStatus::TimedOut,
                    Error::Cancelled(_) => PhaseStatus::Cancelled,
                    _ => PhaseStatus::Failed,
                };
                let message = err.to_string();
                Self {
                    phase,
                    optional,
                    status,
                    result: err.into_result(),
                    error: Some(message),
                }
            }
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.result.as_ref().map(|r| r.artifact.as_path())
    }
}

/// Ordered outcome of a whole pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub operation: String,
    pub cluster: String,
    pub status: PipelineStatus,
    pub phases: Vec<PhaseReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Succeeded
    }

    /// Names of the phases that did not succeed, in execution order
    pub fn failed_phases(&self) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| !p.status.is_success())
            .map(|p| p.phase.as_str())
            .collect()
    }

    /// Artifact paths written during the run, in execution order
    pub fn artifacts(&self) -> Vec<&Path> {
        self.phases.iter().filter_map(PhaseReport::artifact).collect()
    }
}
