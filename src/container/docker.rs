//! Docker Engine API implementation of [`ContainerRuntime`].

use super::runtime::{
    ContainerRuntime, ContainerSpec, ExecOutput, LogOptions, NetworkIo, RuntimeResult,
    StatsSnapshot,
};
use crate::error::RuntimeError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StatsOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::Docker;
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Translate an Engine API error, keeping 404 and 409 distinguishable
fn map_err(err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(message),
        DockerError::DockerResponseServerError {
            status_code: 409,
            message,
        } => RuntimeError::Conflict(message),
        other => RuntimeError::Api(other.to_string()),
    }
}

/// Container runtime backed by the local Docker daemon
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket
    pub fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(map_err)?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn network_exists(&self, name: &str) -> RuntimeResult<bool> {
        let mut filters = HashMap::new();
        filters.insert("name", vec![name]);
        let networks = self
            .docker
            .list_networks(Some(ListNetworksOptions { filters }))
            .await
            .map_err(map_err)?;
        // the name filter matches substrings
        Ok(networks.iter().any(|n| n.name.as_deref() == Some(name)))
    }

    async fn create_network(&self, name: &str) -> RuntimeResult<()> {
        let options = CreateNetworkOptions {
            name,
            driver: "bridge",
            check_duplicate: true,
            ..Default::default()
        };
        self.docker.create_network(options).await.map_err(map_err)?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> RuntimeResult<bool> {
        match self.docker.inspect_image(image).await.map_err(map_err) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        info!(image, "pulling image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .try_for_each(|progress| async move {
                if let Some(status) = progress.status {
                    debug!(%status, "pull progress");
                }
                Ok(())
            })
            .await
            .map_err(map_err)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
            .ports
            .iter()
            .map(|p| {
                (
                    format!("{}/tcp", p.container_port),
                    Some(vec![PortBinding {
                        host_ip: None,
                        host_port: Some(p.host_port.to_string()),
                    }]),
                )
            })
            .collect();
        let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
            .ports
            .iter()
            .map(|p| (format!("{}/tcp", p.container_port), HashMap::new()))
            .collect();

        let host_config = HostConfig {
            network_mode: Some(spec.network.clone()),
            port_bindings: Some(port_bindings),
            binds: (!spec.binds.is_empty()).then(|| spec.binds.clone()),
            memory: Some(spec.memory),
            memory_swap: Some(spec.memory_swap),
            auto_remove: Some(false),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed_ports),
            labels: Some(spec.labels.iter().cloned().collect()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(map_err)?;
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_err)
    }

    async fn logs(&self, id: &str, options: LogOptions) -> RuntimeResult<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: options.timestamps,
            tail: options
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };
        let chunks: Vec<_> = self
            .docker
            .logs(id, Some(options))
            .try_collect()
            .await
            .map_err(map_err)?;
        Ok(chunks.iter().map(ToString::to_string).collect())
    }

    async fn stats(&self, id: &str) -> RuntimeResult<StatsSnapshot> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let stats = self
            .docker
            .stats(id, Some(options))
            .next()
            .await
            .ok_or_else(|| RuntimeError::Api(format!("no stats returned for {}", id)))?
            .map_err(map_err)?;

        let networks = stats
            .networks
            .unwrap_or_default()
            .into_iter()
            .map(|(name, n)| {
                (
                    name,
                    NetworkIo {
                        rx_bytes: n.rx_bytes,
                        tx_bytes: n.tx_bytes,
                    },
                )
            })
            .collect();

        Ok(StatsSnapshot {
            cpu_total: stats.cpu_stats.cpu_usage.total_usage,
            precpu_total: stats.precpu_stats.cpu_usage.total_usage,
            system_cpu: stats.cpu_stats.system_cpu_usage,
            presystem_cpu: stats.precpu_stats.system_cpu_usage,
            online_cpus: stats.cpu_stats.online_cpus,
            memory_usage: stats.memory_stats.usage,
            memory_limit: stats.memory_stats.limit,
            networks,
        })
    }

    async fn exec(
        &self,
        id: &str,
        cmd: Vec<String>,
        stdin: Option<String>,
    ) -> RuntimeResult<ExecOutput> {
        let options = CreateExecOptions {
            cmd: Some(cmd),
            attach_stdin: Some(stdin.is_some()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let exec = self.docker.create_exec(id, options).await.map_err(map_err)?;

        let mut output = String::new();
        match self.docker.start_exec(&exec.id, None).await.map_err(map_err)? {
            StartExecResults::Attached {
                output: mut stream,
                mut input,
            } => {
                if let Some(text) = stdin {
                    input
                        .write_all(text.as_bytes())
                        .await
                        .map_err(|e| RuntimeError::Api(e.to_string()))?;
                    input
                        .shutdown()
                        .await
                        .map_err(|e| RuntimeError::Api(e.to_string()))?;
                }
                while let Some(chunk) = stream.next().await {
                    output.push_str(&chunk.map_err(map_err)?.to_string());
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self.docker.inspect_exec(&exec.id).await.map_err(map_err)?;
        Ok(ExecOutput {
            exit_code: inspect.exit_code,
            output,
        })
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        match self.docker.stop_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            // already stopped
            Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(map_err)
    }
}
