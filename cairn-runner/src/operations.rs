//! Operation catalog
//!
//! Builds the pipelines for the cluster lifecycle operations from cluster
//! metadata. Each operation is a fixed list of phases from the registry.

use cairn_core::domain::cluster::ClusterSpec;
use cairn_core::{Error, Result};
use std::str::FromStr;

use crate::phases::PhaseKind;
use crate::pipeline::Pipeline;

/// Lifecycle operations that can be run against a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Full install of a new cluster
    Install,
    /// In-place version upgrade
    Upgrade,
    /// Adds ingress capability to a running cluster
    Ingress,
}

impl Operation {
    pub const ALL: &'static [Operation] =
        &[Operation::Install, Operation::Upgrade, Operation::Ingress];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Upgrade => "upgrade",
            Operation::Ingress => "ingress",
        }
    }

    /// Phases of the operation with their optional flag, in execution order
    pub fn phases(&self) -> &'static [(PhaseKind, bool)] {
        match self {
            Operation::Install => &[
                (PhaseKind::Base, false),
                (PhaseKind::ContainerRuntime, false),
                (PhaseKind::Etcd, false),
                (PhaseKind::KubeMaster, false),
                (PhaseKind::KubeWorker, false),
                (PhaseKind::NetworkPlugin, false),
                (PhaseKind::PostInstall, true),
                (PhaseKind::IngressController, true),
            ],
            Operation::Upgrade => &[
                (PhaseKind::UpgradeCluster, false),
                (PhaseKind::PostInstall, true),
            ],
            Operation::Ingress => &[(PhaseKind::IngressController, false)],
        }
    }

    /// Builds the operation's pipeline for a cluster
    pub fn pipeline(&self, spec: &ClusterSpec) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.name());
        for (kind, optional) in self.phases() {
            pipeline.push(kind.build(spec), *optional);
        }
        pipeline.validate()?;
        Ok(pipeline)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::configuration(s, "unknown operation"))
    }
}

pub fn install(spec: &ClusterSpec) -> Result<Pipeline> {
    Operation::Install.pipeline(spec)
}

pub fn upgrade(spec: &ClusterSpec) -> Result<Pipeline> {
    Operation::Upgrade.pipeline(spec)
}

pub fn ingress(spec: &ClusterSpec) -> Result<Pipeline> {
    Operation::Ingress.pipeline(spec)
}

/// Pipeline that re-executes a single phase
pub fn single_phase(kind: PhaseKind, spec: &ClusterSpec) -> Pipeline {
    let mut pipeline = Pipeline::new(kind.name());
    pipeline.push(kind.build(spec), false);
    pipeline
}
