//! Container runtime abstraction.
//!
//! The lifecycle manager only talks to a [`ContainerRuntime`]; the Docker
//! Engine implementation lives in `docker.rs`.

use crate::error::RuntimeError;
use async_trait::async_trait;
use std::time::Duration;

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

/// Host port published for a container port (TCP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
}

/// Everything needed to create a container
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `KEY=VALUE` entries
    pub env: Vec<String>,
    pub network: String,
    pub ports: Vec<PortMapping>,
    /// Bind mounts in `host:container[:mode]` form
    pub binds: Vec<String>,
    pub memory: i64,
    pub memory_swap: i64,
    pub labels: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogOptions {
    pub timestamps: bool,
    /// Only the last `n` lines
    pub tail: Option<usize>,
}

/// Bytes moved through one network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, schemars::JsonSchema)]
pub struct NetworkIo {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One raw resource usage sample with the previous CPU reading
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSnapshot {
    pub cpu_total: u64,
    pub precpu_total: u64,
    pub system_cpu: Option<u64>,
    pub presystem_cpu: Option<u64>,
    pub online_cpus: Option<u64>,
    pub memory_usage: Option<u64>,
    pub memory_limit: Option<u64>,
    pub networks: Vec<(String, NetworkIo)>,
}

/// Result of a command run inside a container
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutput {
    pub exit_code: Option<i64>,
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Operations the lifecycle manager needs from a container engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn network_exists(&self, name: &str) -> RuntimeResult<bool>;

    /// Create a bridge network; an existing network yields `Conflict`
    async fn create_network(&self, name: &str) -> RuntimeResult<()>;

    async fn image_exists(&self, image: &str) -> RuntimeResult<bool>;

    async fn pull_image(&self, image: &str) -> RuntimeResult<()>;

    /// Create a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    async fn start_container(&self, id: &str) -> RuntimeResult<()>;

    /// Combined stdout and stderr
    async fn logs(&self, id: &str, options: LogOptions) -> RuntimeResult<String>;

    async fn stats(&self, id: &str) -> RuntimeResult<StatsSnapshot>;

    /// Run `cmd` in the container, feeding `stdin` when given
    async fn exec(
        &self,
        id: &str,
        cmd: Vec<String>,
        stdin: Option<String>,
    ) -> RuntimeResult<ExecOutput>;

    /// Stop with a grace period; stopping a stopped container succeeds
    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()>;

    async fn remove_container(&self, id: &str) -> RuntimeResult<()>;
}
