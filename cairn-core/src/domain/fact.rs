//! Fact store
//!
//! Facts are the named variables handed to the automation engine on every
//! invocation. The store is rebuilt for each pipeline run and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Fact names understood by the bundled playbooks
pub mod names {
    pub const CLUSTER_NAME: &str = "cluster_name";
    pub const CONTAINER_RUNTIME: &str = "container_runtime";
    pub const INGRESS_CONTROLLER_TYPE: &str = "ingress_controller_type";
    pub const KUBE_POD_SUBNET: &str = "kube_pod_subnet";
    pub const KUBE_SERVICE_SUBNET: &str = "kube_service_subnet";
    pub const KUBE_UPGRADE_VERSION: &str = "kube_upgrade_version";
    pub const KUBE_VERSION: &str = "kube_version";
    pub const NETWORK_PLUGIN: &str = "network_plugin";
}

/// Mapping of fact names to values
///
/// Holds at most one value per name; a later `set` replaces the earlier value.
/// Backed by a `BTreeMap` so the serialized form handed to the engine is
/// stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactStore {
    facts: BTreeMap<String, JsonValue>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fact, returning the value it replaced
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.facts.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.facts.get(name)
    }

    /// Returns the fact as a string slice if it holds a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.facts.get(name).and_then(JsonValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.facts.iter()
    }

    /// Serializes the store as a JSON object for the engine's variable input
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.facts).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K, V> FromIterator<(K, V)> for FactStore
where
    K: Into<String>,
    V: Into<JsonValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = FactStore::new();
        for (name, value) in iter {
            store.set(name, value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut facts = FactStore::new();
        assert_eq!(facts.set(names::INGRESS_CONTROLLER_TYPE, "nginx"), None);
        facts.set(names::INGRESS_CONTROLLER_TYPE, "traefik");
        let previous = facts.set(names::INGRESS_CONTROLLER_TYPE, "nginx");

        assert_eq!(previous, Some(JsonValue::from("traefik")));
        assert_eq!(facts.get_str(names::INGRESS_CONTROLLER_TYPE), Some("nginx"));
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_to_json_is_sorted() {
        let facts: FactStore = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(facts.to_json(), r#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn test_non_string_values() {
        let mut facts = FactStore::new();
        facts.set("replicas", 3);
        facts.set("enable_dns_cache", true);

        assert_eq!(facts.get("replicas"), Some(&JsonValue::from(3)));
        assert_eq!(facts.get_str("replicas"), None);
        assert!(facts.contains("enable_dns_cache"));
    }
}
