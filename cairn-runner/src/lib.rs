//! Cairn Runner
//!
//! Drives cluster-lifecycle operations as ordered pipelines of phases.
//!
//! Architecture:
//! - Context: facts, inventory and playbook selection for one pipeline run
//! - Playbook: catalog resolution and the external engine process runner
//! - Phases: one type per unit of work, each bound to fixed playbooks
//! - Pipeline: sequential orchestration with fail-fast and optional phases
//! - Operations: the install, upgrade and ingress pipelines
//!
//! A pipeline run owns its execution context; runs for different clusters
//! can be driven concurrently on separate tasks.

pub mod cancel;
pub mod config;
pub mod context;
pub mod operations;
pub mod phases;
pub mod pipeline;
pub mod playbook;

#[cfg(test)]
mod testing;

pub use cancel::CancellationToken;
pub use config::RunnerConfig;
pub use context::ExecutionContext;
pub use operations::Operation;
pub use phases::{Phase, PhaseKind};
pub use pipeline::{Pipeline, PipelineRun};
pub use playbook::{EngineRunner, PlaybookCatalog, PlaybookExecutor};
