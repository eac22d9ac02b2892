//! Playbook execution
//!
//! - Catalog: resolves playbook identifiers to files
//! - Recap: parses the engine's per-target summary
//! - Process: runs the engine as a child process and captures its output
//!
//! Phases only see the `PlaybookExecutor` trait, so tests can substitute a
//! recording fake for the real engine.

mod catalog;
mod process;
mod recap;

use async_trait::async_trait;
use cairn_core::Result;
use cairn_core::domain::result::PlaybookResult;

use crate::context::ExecutionContext;

pub use catalog::PlaybookCatalog;
pub use process::EngineRunner;
pub use recap::RecapParser;

/// Executes the playbook currently selected in an execution context
#[async_trait]
pub trait PlaybookExecutor: Send + Sync {
    /// Runs the context's pending playbook selection
    ///
    /// # Arguments
    /// * `ctx` - Execution context holding facts, inventory and selection
    /// * `artifact` - Name or path of the artifact receiving engine output
    ///
    /// # Returns
    /// The result of the invocation. Non-zero exits, timeouts and
    /// cancellation are reported through `PlaybookResult::status`; errors are
    /// reserved for runs that could not be attempted.
    async fn execute(&self, ctx: &ExecutionContext, artifact: &str) -> Result<PlaybookResult>;
}
