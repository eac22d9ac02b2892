//! Cluster metadata supplied by the caller
//!
//! A `ClusterSpec` is the inbound request payload: it names the cluster,
//! points at its inventory and carries the settings phases turn into facts.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::domain::fact::{FactStore, names};
use crate::domain::inventory::Inventory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub inventory: Inventory,
    #[serde(default)]
    pub container_runtime: Option<String>,
    #[serde(default)]
    pub kube_version: Option<String>,
    #[serde(default)]
    pub network: NetworkSpec,
    /// Empty means the engine's built-in default controller
    #[serde(default)]
    pub ingress_controller_type: String,
    /// Additional facts seeded into every run
    #[serde(default)]
    pub facts: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default)]
    pub plugin: Option<String>,
    #[serde(default)]
    pub pod_subnet: Option<String>,
    #[serde(default)]
    pub service_subnet: Option<String>,
}

impl ClusterSpec {
    pub fn new(name: impl Into<String>, inventory: Inventory) -> Self {
        Self {
            name: name.into(),
            inventory,
            container_runtime: None,
            kube_version: None,
            network: NetworkSpec::default(),
            ingress_controller_type: String::new(),
            facts: BTreeMap::new(),
        }
    }

    /// Builds the initial fact store for a run against this cluster
    ///
    /// Only cluster-wide facts are seeded here. Phase-specific facts are
    /// injected by the phases themselves.
    pub fn seed_facts(&self) -> FactStore {
        let mut facts = FactStore::new();
        for (name, value) in &self.facts {
            facts.set(name.clone(), value.clone());
        }
        facts.set(names::CLUSTER_NAME, self.name.clone());
        if let Some(subnet) = &self.network.service_subnet {
            facts.set(names::KUBE_SERVICE_SUBNET, subnet.clone());
        }
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let spec: ClusterSpec = serde_json::from_str(
            r#"{"name": "prod", "inventory": {"file": "/etc/cairn/prod.ini"}}"#,
        )
        .unwrap();

        assert_eq!(spec.name, "prod");
        assert!(spec.ingress_controller_type.is_empty());
        assert_eq!(spec.network, NetworkSpec::default());
    }

    #[test]
    fn test_seed_facts() {
        let mut spec = ClusterSpec::new("prod", Inventory::Hosts(vec!["10.0.0.1".to_string()]));
        spec.network.service_subnet = Some("10.68.0.0/16".to_string());
        spec.facts
            .insert(names::CLUSTER_NAME.to_string(), JsonValue::from("ignored"));
        spec.facts.insert("ntp_server".to_string(), JsonValue::from("pool.ntp.org"));

        let facts = spec.seed_facts();
        assert_eq!(facts.get_str(names::CLUSTER_NAME), Some("prod"));
        assert_eq!(facts.get_str(names::KUBE_SERVICE_SUBNET), Some("10.68.0.0/16"));
        assert_eq!(facts.get_str("ntp_server"), Some("pool.ntp.org"));
    }
}
