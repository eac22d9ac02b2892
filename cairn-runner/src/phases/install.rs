//! Phases of the cluster install flow

use async_trait::async_trait;
use cairn_core::domain::fact::names;
use cairn_core::domain::playbook;
use cairn_core::domain::result::PlaybookResult;
use cairn_core::{Error, Result};
use std::net::Ipv4Addr;

use super::{Phase, run_playbooks};
use crate::context::ExecutionContext;
use crate::playbook::PlaybookExecutor;

const SUPPORTED_RUNTIMES: &[&str] = &["docker", "containerd"];

/// Treats an empty selector the same as an unset one
fn selector(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Prepares every host: packages, kernel settings, time sync
pub struct Base;

#[async_trait]
impl Phase for Base {
    fn name(&self) -> &str {
        "Base"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::BASE]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

/// Installs the container runtime
pub struct ContainerRuntime {
    runtime: Option<String>,
}

impl ContainerRuntime {
    pub fn new(runtime: Option<String>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Phase for ContainerRuntime {
    fn name(&self) -> &str {
        "ContainerRuntime"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::CONTAINER_RUNTIME]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        if let Some(runtime) = selector(&self.runtime) {
            if !SUPPORTED_RUNTIMES.contains(&runtime) {
                return Err(Error::configuration(
                    self.name(),
                    format!(
                        "unsupported container runtime '{}', expected one of: {}",
                        runtime,
                        SUPPORTED_RUNTIMES.join(", ")
                    ),
                ));
            }
            ctx.set_var(names::CONTAINER_RUNTIME, runtime);
        }
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

pub struct Etcd;

#[async_trait]
impl Phase for Etcd {
    fn name(&self) -> &str {
        "Etcd"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::ETCD]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

/// Brings up the control plane
pub struct KubeMaster {
    kube_version: Option<String>,
}

impl KubeMaster {
    pub fn new(kube_version: Option<String>) -> Self {
        Self { kube_version }
    }
}

#[async_trait]
impl Phase for KubeMaster {
    fn name(&self) -> &str {
        "KubeMaster"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::KUBE_MASTER]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        if let Some(version) = selector(&self.kube_version) {
            ctx.set_var(names::KUBE_VERSION, version);
        }
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

pub struct KubeWorker;

#[async_trait]
impl Phase for KubeWorker {
    fn name(&self) -> &str {
        "KubeWorker"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::KUBE_WORKER]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

/// Deploys the pod network
pub struct NetworkPlugin {
    plugin: Option<String>,
    pod_subnet: Option<String>,
}

impl NetworkPlugin {
    pub fn new(plugin: Option<String>, pod_subnet: Option<String>) -> Self {
        Self { plugin, pod_subnet }
    }
}

/// Accepts `a.b.c.d/n` with a valid address and a prefix of at most 32
fn is_ipv4_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };
    address.parse::<Ipv4Addr>().is_ok()
        && prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false)
}

#[async_trait]
impl Phase for NetworkPlugin {
    fn name(&self) -> &str {
        "NetworkPlugin"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::NETWORK_PLUGIN]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        if let Some(subnet) = selector(&self.pod_subnet) {
            if !is_ipv4_cidr(subnet) {
                return Err(Error::configuration(
                    self.name(),
                    format!("pod subnet '{}' is not an IPv4 CIDR", subnet),
                ));
            }
            ctx.set_var(names::KUBE_POD_SUBNET, subnet);
        }
        if let Some(plugin) = selector(&self.plugin) {
            ctx.set_var(names::NETWORK_PLUGIN, plugin);
        }
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}

/// Installs cluster addons, then runs the post-install checks
pub struct PostInstall;

#[async_trait]
impl Phase for PostInstall {
    fn name(&self) -> &str {
        "PostInstall"
    }

    fn playbooks(&self) -> &[&'static str] {
        &[playbook::ADDON, playbook::POST]
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext,
        executor: &dyn PlaybookExecutor,
        artifact: &str,
    ) -> Result<PlaybookResult> {
        run_playbooks(ctx, executor, self.playbooks(), artifact).await
    }
}
