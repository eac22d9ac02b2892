//! Playbook identifiers
//!
//! Identifiers are bound to phases at definition time. Turning an identifier
//! into a path on disk is the job of the runner's playbook catalog.

use serde::{Deserialize, Serialize};

pub const BASE: &str = "01-base.yml";
pub const CONTAINER_RUNTIME: &str = "02-runtime.yml";
pub const ETCD: &str = "06-etcd.yml";
pub const KUBE_MASTER: &str = "07-kube-master.yml";
pub const KUBE_WORKER: &str = "08-kube-worker.yml";
pub const NETWORK_PLUGIN: &str = "10-network-plugin.yml";
pub const ADDON: &str = "11-addon.yml";
pub const POST: &str = "12-post.yml";
pub const INGRESS_CONTROLLER: &str = "14-ingress-controller.yml";
pub const UPGRADE_CLUSTER: &str = "91-upgrade-cluster.yml";

/// Every playbook identifier known to the bundled phases, in install order
pub const ALL: &[&str] = &[
    BASE,
    CONTAINER_RUNTIME,
    ETCD,
    KUBE_MASTER,
    KUBE_WORKER,
    NETWORK_PLUGIN,
    ADDON,
    POST,
    INGRESS_CONTROLLER,
    UPGRADE_CLUSTER,
];

/// Pending execution target of an execution context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookSelection {
    pub id: String,
    /// Restricts the run to tasks carrying this engine tag
    #[serde(default)]
    pub tag: Option<String>,
}

impl PlaybookSelection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.tag = if tag.is_empty() { None } else { Some(tag) };
        self
    }
}
