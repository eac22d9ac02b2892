//! Error types for the orchestrator

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::result::PlaybookResult;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while running phases and playbooks
#[derive(Debug, Error)]
pub enum Error {
    /// A phase's configuration is missing or malformed
    ///
    /// Detected before the engine is invoked.
    #[error("invalid configuration for phase '{phase}': {message}")]
    Configuration { phase: String, message: String },

    /// The playbook identifier does not resolve to a known playbook
    #[error("unknown playbook: {0}")]
    UnknownPlaybook(String),

    /// The artifact destination could not be created or written
    #[error("cannot write artifact {}: {source}", .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine executable could not be launched
    #[error("cannot start automation engine '{program}': {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully
    #[error("execution failed: {0}")]
    Execution(Box<PlaybookResult>),

    /// The engine exceeded its timeout and was terminated
    #[error("execution timed out: {0}")]
    Timeout(Box<PlaybookResult>),

    /// The run was cancelled while the engine was running
    #[error("execution cancelled: {0}")]
    Cancelled(Box<PlaybookResult>),
}

impl Error {
    /// Create a configuration error for a phase
    pub fn configuration(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            phase: phase.into(),
            message: message.into(),
        }
    }

    /// Operator or programmer faults that must not be retried
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::UnknownPlaybook(_) | Self::EngineUnavailable { .. }
        )
    }

    /// Faults of the external run itself; whether to retry is the caller's decision
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The playbook result carried by the error, if the engine ran
    pub fn result(&self) -> Option<&PlaybookResult> {
        match self {
            Self::Execution(result) | Self::Timeout(result) | Self::Cancelled(result) => {
                Some(&**result)
            }
            _ => None,
        }
    }

    /// Consumes the error, returning the playbook result it carries
    pub fn into_result(self) -> Option<PlaybookResult> {
        match self {
            Self::Execution(result) | Self::Timeout(result) | Self::Cancelled(result) => {
                Some(*result)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("UpgradeCluster", "target version is required");
        assert_eq!(
            err.to_string(),
            "invalid configuration for phase 'UpgradeCluster': target version is required"
        );

        let err = Error::UnknownPlaybook("99-missing.yml".to_string());
        assert_eq!(err.to_string(), "unknown playbook: 99-missing.yml");
    }

    #[test]
    fn test_classification() {
        let config = Error::configuration("Base", "bad");
        assert!(config.is_configuration_fault());
        assert!(!config.is_operational());
        assert!(config.result().is_none());

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let artifact = Error::ArtifactWrite {
            path: PathBuf::from("/root/x.log"),
            source: io_err,
        };
        assert!(!artifact.is_configuration_fault());
        assert!(!artifact.is_operational());
    }
}
