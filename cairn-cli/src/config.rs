//! Configuration module
//!
//! Global CLI settings and their translation into the runner configuration.

use anyhow::{Context, Result};
use cairn_core::domain::cluster::ClusterSpec;
use cairn_runner::config::timeout_from_secs;
use cairn_runner::{EngineRunner, RunnerConfig};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: String,
    pub engine_args: Vec<String>,
    pub playbook_dir: PathBuf,
    pub artifact_dir: PathBuf,
    /// Default timeout per playbook, 0 for none
    pub timeout_secs: u64,
}

impl Config {
    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let config = RunnerConfig::new(self.engine.clone(), self.playbook_dir.clone())
            .with_engine_args(self.engine_args.clone())
            .with_artifact_dir(self.artifact_dir.clone())
            .with_timeout(timeout_from_secs(self.timeout_secs));
        config.validate().context("Invalid runner configuration")?;
        Ok(config)
    }

    /// Builds a runner whose catalog holds the bundled playbooks
    pub fn runner(&self) -> Result<EngineRunner> {
        Ok(EngineRunner::with_bundled_playbooks(self.runner_config()?))
    }
}

/// Loads cluster metadata from a JSON file
pub fn load_cluster(path: &Path) -> Result<ClusterSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cluster file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cluster file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::domain::inventory::Inventory;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            engine: "ansible-playbook".to_string(),
            engine_args: vec!["-v".to_string()],
            playbook_dir: PathBuf::from("/opt/cairn/playbooks"),
            artifact_dir: PathBuf::from("/tmp/cairn"),
            timeout_secs: 0,
        }
    }

    #[test]
    fn test_runner_config() {
        let runner = config().runner_config().unwrap();
        assert_eq!(runner.engine_args, vec!["-v"]);
        assert_eq!(runner.timeout, None);

        let runner = Config {
            timeout_secs: 60,
            ..config()
        }
        .runner_config()
        .unwrap();
        assert_eq!(runner.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_runner_config_rejects_empty_engine() {
        let result = Config {
            engine: " ".to_string(),
            ..config()
        }
        .runner_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.json");
        std::fs::write(
            &path,
            r#"{"name": "edge", "inventory": {"hosts": ["10.0.0.1"]}, "ingress_controller_type": "nginx"}"#,
        )
        .unwrap();

        let spec = load_cluster(&path).unwrap();
        assert_eq!(spec.name, "edge");
        assert_eq!(spec.inventory, Inventory::Hosts(vec!["10.0.0.1".to_string()]));
        assert_eq!(spec.ingress_controller_type, "nginx");

        assert!(load_cluster(&dir.path().join("missing.json")).is_err());
    }
}
