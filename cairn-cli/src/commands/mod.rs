//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod list;
mod run;

pub use run::RunArgs;

use anyhow::Result;
use cairn_runner::Operation;
use clap::{Subcommand, ValueEnum};

use crate::config::Config;

/// Operation argument accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OperationArg {
    /// Full cluster install
    Install,
    /// In-place version upgrade
    Upgrade,
    /// Add an ingress controller
    Ingress,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Install => Operation::Install,
            OperationArg::Upgrade => Operation::Upgrade,
            OperationArg::Ingress => Operation::Ingress,
        }
    }
}

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run an operation against a cluster
    Run {
        operation: OperationArg,

        #[command(flatten)]
        args: RunArgs,
    },
    /// Re-run a single phase against a cluster
    Phase {
        /// Phase name (see `cairn phases`)
        name: String,

        #[command(flatten)]
        args: RunArgs,
    },
    /// Show the phases of an operation without running them
    Phases { operation: Option<OperationArg> },
    /// List the playbook catalog
    Playbooks,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { operation, args } => {
            run::handle_run(operation.into(), args, config).await
        }
        Commands::Phase { name, args } => run::handle_phase(&name, args, config).await,
        Commands::Phases { operation } => list::list_phases(operation.map(Operation::from)),
        Commands::Playbooks => list::list_playbooks(config),
    }
}
