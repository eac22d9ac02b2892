//! Phases
//!
//! A phase is a named unit of work bound to fixed playbooks. Running one
//! injects the facts its configuration makes relevant, then asks the executor
//! to run its playbooks. Executor failures propagate unchanged; the only
//! failure a phase produces itself is a configuration check that fails
//! before anything is executed.

mod ingress;
mod install;
mod upgrade;

pub use ingress::IngressController;
pub use install::{
    Base, ContainerRuntime, Etcd, KubeMaster, KubeWorker, NetworkPlugin, PostInstall,
};
pub use upgrade::UpgradeCluster;

use async_trait::async_trait;
use cairn_core::domain::cluster::ClusterSpec;
use cairn_core::domain::playbook::{self, PlaybookSelection};
use cairn_core::domain::result::PlaybookResult;
use cairn_core::{Error, Result};
use std::str::FromStr;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::playbook::PlaybookExecutor;

/// A named unit of work in a pipeline
///
/// Phases are immutable once constructed; everything a run accumulates lives
/// in the execution context.
#[async_trait]
pub trait Phase: Send + Sync {
    /// Constant name, unique within a pipeline
    fn name(&self) -> &str;

    /// Playbooks this phase runs, in order
    fn playbooks(&self) -> &[&'static str];

    /// Runs the phase against the context
    ///
    /// Every playbook of the phase appends to the same artifact.
    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult>;
}

/// Selects a playbook and runs it, turning non-success into an error
pub async fn run_playbook(
    ctx: &mut ExecutionContext,
    executor: &dyn PlaybookExecutor,
    selection: PlaybookSelection,
    artifact: &str,
) -> Result<PlaybookResult> {
    debug!(playbook = %selection.id, tag = ?selection.tag, "Selecting playbook");
    ctx.select_playbook(selection);
    executor.execute(ctx, artifact).await?.into_checked()
}

/// Runs playbooks in order, stopping at the first one that does not succeed
///
/// Returns the result of the last playbook executed.
pub async fn run_playbooks(
    ctx: &mut ExecutionContext,
    executor: &dyn PlaybookExecutor,
    playbooks: &[&str],
    artifact: &str,
) -> Result<PlaybookResult> {
    let mut last = None;
    for id in playbooks {
        last = Some(run_playbook(ctx, executor, PlaybookSelection::new(*id), artifact).await?);
    }
    last.ok_or_else(|| Error::UnknownPlaybook("phase has no playbooks".to_string()))
}

/// Registry of every phase the orchestrator knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Base,
    ContainerRuntime,
    Etcd,
    KubeMaster,
    KubeWorker,
    NetworkPlugin,
    PostInstall,
    IngressController,
    UpgradeCluster,
}

impl PhaseKind {
    pub const ALL: &'static [PhaseKind] = &[
        PhaseKind::Base,
        PhaseKind::ContainerRuntime,
        PhaseKind::Etcd,
        PhaseKind::KubeMaster,
        PhaseKind::KubeWorker,
        PhaseKind::NetworkPlugin,
        PhaseKind::PostInstall,
        PhaseKind::IngressController,
        PhaseKind::UpgradeCluster,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PhaseKind::Base => "Base",
            PhaseKind::ContainerRuntime => "ContainerRuntime",
            PhaseKind::Etcd => "Etcd",
            PhaseKind::KubeMaster => "KubeMaster",
            PhaseKind::KubeWorker => "KubeWorker",
            PhaseKind::NetworkPlugin => "NetworkPlugin",
            PhaseKind::PostInstall => "PostInstall",
            PhaseKind::IngressController => "IngressController",
            PhaseKind::UpgradeCluster => "UpgradeCluster",
        }
    }

    pub fn playbooks(&self) -> &'static [&'static str] {
        match self {
            PhaseKind::Base => &[playbook::BASE],
            PhaseKind::ContainerRuntime => &[playbook::CONTAINER_RUNTIME],
            PhaseKind::Etcd => &[playbook::ETCD],
            PhaseKind::KubeMaster => &[playbook::KUBE_MASTER],
            PhaseKind::KubeWorker => &[playbook::KUBE_WORKER],
            PhaseKind::NetworkPlugin => &[playbook::NETWORK_PLUGIN],
            PhaseKind::PostInstall => &[playbook::ADDON, playbook::POST],
            PhaseKind::IngressController => &[playbook::INGRESS_CONTROLLER],
            PhaseKind::UpgradeCluster => &[playbook::UPGRADE_CLUSTER],
        }
    }

    /// Looks a phase up by its name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Builds the phase with its configuration taken from cluster metadata
    pub fn build(&self, spec: &ClusterSpec) -> Box<dyn Phase> {
        match self {
            PhaseKind::Base => Box::new(Base),
            PhaseKind::ContainerRuntime => {
                Box::new(ContainerRuntime::new(spec.container_runtime.clone()))
            }
            PhaseKind::Etcd => Box::new(Etcd),
            PhaseKind::KubeMaster => Box::new(KubeMaster::new(spec.kube_version.clone())),
            PhaseKind::KubeWorker => Box::new(KubeWorker),
            PhaseKind::NetworkPlugin => Box::new(NetworkPlugin::new(
                spec.network.plugin.clone(),
                spec.network.pod_subnet.clone(),
            )),
            PhaseKind::PostInstall => Box::new(PostInstall),
            PhaseKind::IngressController => {
                Box::new(IngressController::new(spec.ingress_controller_type.clone()))
            }
            PhaseKind::UpgradeCluster => Box::new(UpgradeCluster::new(
                spec.kube_version.clone().unwrap_or_default(),
            )),
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhaseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::configuration(s, "unknown phase"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingExecutor;
    use cairn_core::domain::inventory::Inventory;
    use cairn_core::domain::result::RunStatus;

    fn context() -> ExecutionContext {
        ExecutionContext::new("test", Inventory::Hosts(vec!["node-1".to_string()]))
    }

    #[test]
    fn test_registry_names_are_unique_and_round_trip() {
        let mut names: Vec<&str> = PhaseKind::ALL.iter().map(PhaseKind::name).collect();
        for name in &names {
            assert_eq!(PhaseKind::from_name(name).map(|k| k.name()), Some(*name));
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PhaseKind::ALL.len());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "ingresscontroller".parse::<PhaseKind>().unwrap(),
            PhaseKind::IngressController
        );
        let err = "Teardown".parse::<PhaseKind>().unwrap_err();
        assert!(err.is_configuration_fault());
    }

    #[test]
    fn test_built_phase_matches_registry() {
        let spec = ClusterSpec::new("test", Inventory::Hosts(vec![]));
        for kind in PhaseKind::ALL {
            let phase = kind.build(&spec);
            assert_eq!(phase.name(), kind.name());
            assert_eq!(phase.playbooks(), kind.playbooks());
        }
    }

    #[tokio::test]
    async fn test_run_playbooks_stops_at_first_failure() {
        let executor = RecordingExecutor::new().respond("a.yml", RunStatus::Failed);
        let mut ctx = context();

        let err = run_playbooks(&mut ctx, &executor, &["a.yml", "b.yml"], "x.log")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Execution(_)));
        assert_eq!(executor.playbooks(), vec!["a.yml"]);
    }

    #[tokio::test]
    async fn test_run_playbooks_returns_last_result() {
        let executor = RecordingExecutor::new();
        let mut ctx = context();

        let result = run_playbooks(&mut ctx, &executor, &["a.yml", "b.yml"], "x.log")
            .await
            .unwrap();

        assert_eq!(result.playbook, "b.yml");
        assert_eq!(executor.playbooks(), vec!["a.yml", "b.yml"]);
        assert!(executor.calls().iter().all(|c| c.artifact == "x.log"));
    }
}
