//! Cluster upgrade phase

use async_trait::async_trait;
use cairn_core::domain::fact::names;
use cairn_core::domain::playbook;
use cairn_core::domain::result::PlaybookResult;
use cairn_core::{Error, Result};

use super::{Phase, run_playbooks};
use crate::context::ExecutionContext;
use crate::playbook::PlaybookExecutor;

/// Upgrades every node of the cluster to a target version
pub struct UpgradeCluster {
    version: String,
}

impl UpgradeCluster {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl Phase for UpgradeCluster {
    fn name(&self) -> &str {
        "UpgradeCluster"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::UPGRADE_CLUSTER]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        let version = self.version.trim();
        if version.is_empty() {
            return Err(Error::configuration(
                self.name(),
                "target version is required",
            ));
        }
        ctx.set_var(names::KUBE_UPGRADE_VERSION, version);
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}
