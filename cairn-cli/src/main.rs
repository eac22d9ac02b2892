//! Cairn CLI
//!
//! Command-line interface for running cluster lifecycle operations.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Cluster lifecycle phase orchestrator", long_about = None)]
struct Cli {
    /// Automation engine executable
    #[arg(long, env = "CAIRN_ENGINE", default_value = "ansible-playbook")]
    engine: String,

    /// Extra engine arguments, whitespace separated (e.g. "-v --diff")
    #[arg(long, env = "CAIRN_ENGINE_ARGS", allow_hyphen_values = true)]
    engine_args: Option<String>,

    /// Directory holding the playbooks
    #[arg(long, env = "CAIRN_PLAYBOOK_DIR", default_value = "/opt/cairn/playbooks")]
    playbook_dir: PathBuf,

    /// Directory artifacts are written to
    #[arg(
        long,
        env = "CAIRN_ARTIFACT_DIR",
        default_value = "/var/lib/cairn/artifacts"
    )]
    artifact_dir: PathBuf,

    /// Default timeout per playbook in seconds (0 disables)
    #[arg(long, env = "CAIRN_TIMEOUT", default_value = "7200")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cairn_cli=info,cairn_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        engine: cli.engine,
        engine_args: cli
            .engine_args
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        playbook_dir: cli.playbook_dir,
        artifact_dir: cli.artifact_dir,
        timeout_secs: cli.timeout,
    };

    handle_command(cli.command, &config).await
}
