//! Run command handlers
//!
//! Runs an operation or a single phase against a cluster and prints the
//! per-phase report. Ctrl-C cancels the run: the running engine is killed
//! and no further phase starts.

use anyhow::{Context, Result};
use cairn_core::domain::cluster::ClusterSpec;
use cairn_core::domain::inventory::Inventory;
use cairn_core::domain::pipeline::{PhaseStatus, PipelineReport, PipelineStatus};
use cairn_runner::{ExecutionContext, Operation, PhaseKind, Pipeline, operations};
use clap::Args;
use colored::*;
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::config::{Config, load_cluster};

/// Arguments shared by every command that runs phases
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Cluster metadata file (JSON)
    #[arg(short, long)]
    pub cluster: PathBuf,

    /// Inventory file, overrides the cluster file
    #[arg(short, long, conflicts_with = "hosts")]
    pub inventory: Option<PathBuf>,

    /// Target hosts (comma-separated), overrides the cluster file
    #[arg(long, value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Extra facts as key=value pairs; values are parsed as JSON when possible
    #[arg(short = 'e', long = "set", value_parser = parse_key_val)]
    pub facts: Vec<(String, String)>,

    /// Kubernetes version (install target, or upgrade target)
    #[arg(long)]
    pub kube_version: Option<String>,

    /// Ingress controller type (e.g. nginx)
    #[arg(long)]
    pub ingress_type: Option<String>,

    /// Timeout per playbook in seconds for this run (use the global
    /// `--timeout 0` to run without one)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Prefix of the per-phase artifact names
    #[arg(long)]
    pub artifact_prefix: Option<String>,

    /// Keep going after a failing phase
    #[arg(long)]
    pub continue_on_error: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Loads the cluster file and applies the command line overrides
    pub fn cluster_spec(&self) -> Result<ClusterSpec> {
        let mut spec = load_cluster(&self.cluster)?;

        if let Some(path) = &self.inventory {
            spec.inventory = Inventory::File(path.clone());
        } else if !self.hosts.is_empty() {
            spec.inventory = Inventory::Hosts(self.hosts.clone());
        }

        for (name, value) in &self.facts {
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| JsonValue::String(value.clone()));
            spec.facts.insert(name.clone(), value);
        }

        if let Some(version) = &self.kube_version {
            spec.kube_version = Some(version.clone());
        }

        if let Some(controller) = &self.ingress_type {
            spec.ingress_controller_type = controller.clone();
        }

        Ok(spec)
    }
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Run a lifecycle operation
pub async fn handle_run(operation: Operation, args: RunArgs, config: &Config) -> Result<()> {
    let spec = args.cluster_spec()?;
    let pipeline = operation
        .pipeline(&spec)
        .with_context(|| format!("Failed to build {} pipeline", operation))?;

    run_pipeline(pipeline, &spec, &args, config).await
}

/// Re-run a single phase
pub async fn handle_phase(name: &str, args: RunArgs, config: &Config) -> Result<()> {
    let kind = PhaseKind::from_name(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown phase '{}', expected one of: {}",
            name,
            PhaseKind::ALL
                .iter()
                .map(PhaseKind::name)
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let spec = args.cluster_spec()?;
    let pipeline = operations::single_phase(kind, &spec);

    run_pipeline(pipeline, &spec, &args, config).await
}

async fn run_pipeline(
    pipeline: Pipeline,
    spec: &ClusterSpec,
    args: &RunArgs,
    config: &Config,
) -> Result<()> {
    let runner = config.runner()?;

    let mut ctx = ExecutionContext::from_cluster(spec);
    if let Some(secs) = args.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let pipeline = pipeline.continue_on_error(args.continue_on_error);
    let mut run = pipeline.start(ctx)?;
    if let Some(prefix) = &args.artifact_prefix {
        run = run.with_artifact_prefix(prefix.clone());
    }

    let token = run.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            token.cancel();
        }
    });

    let report = run.execute(&runner).await;
    interrupt.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        anyhow::bail!("{} finished with status {}", report.operation, report.status);
    }

    Ok(())
}

/// Print the per-phase summary of a run
fn print_report(report: &PipelineReport) {
    println!();
    println!(
        "{} {} on {}",
        "Pipeline".bold(),
        report.operation.bold(),
        report.cluster.cyan()
    );
    println!("  Run ID: {}", report.run_id.to_string().dimmed());
    println!();

    for (index, phase) in report.phases.iter().enumerate() {
        let marker = match phase.status {
            PhaseStatus::Succeeded => "✓".green(),
            PhaseStatus::Failed => "✗".red(),
            PhaseStatus::TimedOut => "⏱".yellow(),
            PhaseStatus::Cancelled => "⊘".yellow(),
        };
        let optional = if phase.optional { " (optional)" } else { "" };
        println!(
            "  {} {:02} {}{}",
            marker,
            index + 1,
            phase.phase.bold(),
            optional.dimmed()
        );

        if let Some(result) = &phase.result {
            println!("       Duration: {}s", result.duration().num_seconds());
            let failed = result.failed_targets();
            if !failed.is_empty() {
                println!("       Failed:   {}", failed.join(", ").red());
            }
            println!(
                "       Output:   {}",
                result.artifact.display().to_string().dimmed()
            );
        }
        if let Some(error) = &phase.error {
            println!("       Error:    {}", error.red());
        }
    }

    let status = report.status.to_string();
    let status = match report.status {
        PipelineStatus::Succeeded => status.green(),
        PipelineStatus::Failed => status.red(),
        PipelineStatus::PartiallyFailed | PipelineStatus::Cancelled => status.yellow(),
        PipelineStatus::Pending | PipelineStatus::Running => status.normal(),
    };
    println!();
    println!("  Status: {}", status.bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::domain::playbook;
    use clap::Parser;

    fn args(cluster: PathBuf) -> RunArgs {
        RunArgs {
            cluster,
            inventory: None,
            hosts: Vec::new(),
            facts: Vec::new(),
            kube_version: None,
            ingress_type: None,
            timeout: None,
            artifact_prefix: None,
            continue_on_error: false,
            json: true,
        }
    }

    fn write_cluster(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("cluster.json");
        std::fs::write(
            &path,
            r#"{"name": "edge", "inventory": {"file": "/etc/cairn/edge.ini"}}"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("ntp_server=10.0.0.5").unwrap(),
            ("ntp_server".to_string(), "10.0.0.5".to_string())
        );
        assert_eq!(
            parse_key_val("opts=a=b").unwrap(),
            ("opts".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_per_run_timeout_must_be_positive() {
        let parsed = TestCli::try_parse_from(["cairn", "--cluster", "c.json", "--timeout", "90"]);
        assert_eq!(parsed.unwrap().args.timeout, Some(90));

        let parsed = TestCli::try_parse_from(["cairn", "--cluster", "c.json", "--timeout", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_overrides_apply_to_cluster_spec() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(write_cluster(dir.path()));
        args.hosts = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        args.facts = vec![
            ("dns_replicas".to_string(), "3".to_string()),
            ("dns_domain".to_string(), "cluster.local".to_string()),
        ];
        args.ingress_type = Some("nginx".to_string());

        let spec = args.cluster_spec().unwrap();

        assert_eq!(
            spec.inventory,
            Inventory::Hosts(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        );
        assert_eq!(spec.facts["dns_replicas"], JsonValue::from(3));
        assert_eq!(spec.facts["dns_domain"], JsonValue::from("cluster.local"));
        assert_eq!(spec.ingress_controller_type, "nginx");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_ingress_with_fake_engine() {
        let dir = tempfile::tempdir().unwrap();
        let playbooks = dir.path().join("playbooks");
        std::fs::create_dir_all(&playbooks).unwrap();
        for id in playbook::ALL {
            std::fs::write(playbooks.join(id), "- hosts: all\n").unwrap();
        }
        let script = dir.path().join("engine.sh");
        std::fs::write(&script, "echo \"$@\"\nexit 0\n").unwrap();

        let config = Config {
            engine: "/bin/sh".to_string(),
            engine_args: vec![script.to_string_lossy().to_string()],
            playbook_dir: playbooks,
            artifact_dir: dir.path().join("artifacts"),
            timeout_secs: 30,
        };

        let mut args = args(write_cluster(dir.path()));
        args.ingress_type = Some("nginx".to_string());
        args.artifact_prefix = Some("edge-ingress".to_string());

        handle_run(Operation::Ingress, args, &config).await.unwrap();

        let artifact = dir
            .path()
            .join("artifacts")
            .join("edge-ingress-01-IngressController.log");
        let output = std::fs::read_to_string(artifact).unwrap();
        assert!(output.contains(r#""ingress_controller_type":"nginx""#));
    }

    #[tokio::test]
    async fn test_unknown_phase() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            engine: "ansible-playbook".to_string(),
            engine_args: Vec::new(),
            playbook_dir: dir.path().to_path_buf(),
            artifact_dir: dir.path().to_path_buf(),
            timeout_secs: 0,
        };

        let err = handle_phase("Teardown", args(write_cluster(dir.path())), &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown phase"));
    }
}
