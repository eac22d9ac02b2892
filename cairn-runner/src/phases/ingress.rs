//! Ingress controller phase

use async_trait::async_trait;
use cairn_core::domain::fact::names;
use cairn_core::domain::playbook;
use cairn_core::domain::result::PlaybookResult;
use cairn_core::Result;
use tracing::debug;

use super::{Phase, run_playbooks};
use crate::context::ExecutionContext;
use crate::playbook::PlaybookExecutor;

/// Deploys an ingress controller into the cluster
///
/// An empty controller type leaves the choice to the playbook's default.
pub struct IngressController {
    controller_type: String,
}

impl IngressController {
    pub fn new(controller_type: impl Into<String>) -> Self {
        Self {
            controller_type: controller_type.into(),
        }
    }

    pub fn controller_type(&self) -> &str {
        &self.controller_type
    }
}

#[async_trait]
impl Phase for IngressController {
    fn name(&self) -> &str {
        "IngressController"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::INGRESS_CONTROLLER]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        if self.controller_type.is_empty() {
            debug!("No ingress controller type set, using playbook default");
        } else {
            ctx.set_var(names::INGRESS_CONTROLLER_TYPE, self.controller_type.as_str());
        }
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}
