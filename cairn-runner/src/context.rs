//! Execution context for a pipeline run
//!
//! Contains all state a run accumulates while its phases execute:
//! - Fact store handed to the engine as its variable input
//! - Inventory the engine targets
//! - Pending playbook selection for the next invocation
//! - Cancellation token for the run
//!
//! A context is created for one run and dropped with it. It is deliberately
//! not `Clone`: two runs can never end up sharing one.

use cairn_core::domain::cluster::ClusterSpec;
use cairn_core::domain::fact::FactStore;
use cairn_core::domain::inventory::Inventory;
use cairn_core::domain::playbook::PlaybookSelection;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::cancel::CancellationToken;

/// Mutable state shared by every phase of one pipeline run
#[derive(Debug)]
pub struct ExecutionContext {
    run_id: Uuid,
    cluster: String,
    facts: FactStore,
    inventory: Inventory,
    selection: Option<PlaybookSelection>,
    timeout: Option<Duration>,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Creates an empty context for a cluster
    pub fn new(cluster: impl Into<String>, inventory: Inventory) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cluster: cluster.into(),
            facts: FactStore::new(),
            inventory,
            selection: None,
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Creates a context seeded from cluster metadata
    pub fn from_cluster(spec: &ClusterSpec) -> Self {
        Self::new(spec.name.clone(), spec.inventory.clone()).with_facts(spec.seed_facts())
    }

    pub fn with_facts(mut self, facts: FactStore) -> Self {
        self.facts = facts;
        self
    }

    /// Overrides the runner's default timeout for every invocation in this run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Sets a fact, overwriting any previous value
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        let name = name.into();
        let value = value.into();
        debug!(run_id = %self.run_id, fact = %name, value = %value, "Setting fact");
        self.facts.set(name, value);
    }

    pub fn var(&self, name: &str) -> Option<&JsonValue> {
        self.facts.get(name)
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn set_inventory(&mut self, inventory: Inventory) {
        self.inventory = inventory;
    }

    /// Sets the pending execution target
    ///
    /// Not validated here; the runner fails if it cannot resolve the id.
    pub fn select_playbook(&mut self, selection: PlaybookSelection) {
        self.selection = Some(selection);
    }

    pub fn selected_playbook(&self) -> Option<&PlaybookSelection> {
        self.selection.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns a handle that can cancel this run from another task
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
