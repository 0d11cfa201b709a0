//! Container lifecycle management.
//!
//! Provisions database and application containers on a shared bridge network,
//! waits for readiness, seeds databases from a schema file, and tears
//! everything down again. Every container is registered as soon as it exists
//! so `cleanup_all` also reclaims units from failed provisioning calls.

use super::config::{DatabaseConfig, DatabaseKind, EnvironmentConfig, LifecycleConfig};
use super::docker::DockerRuntime;
use super::metrics::ContainerMetrics;
use super::registry::{ContainerRole, ContainerState, Registry, RegistryEntry};
use super::runtime::{ContainerRuntime, ContainerSpec, LogOptions, PortMapping};
use crate::error::{Error, Result, RuntimeError};
use crate::generator::TestDataGenerator;
use crate::input;
use crate::schema::{Dialect, SchemaParser};
use crate::synth::Synthesizer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Connection details of a database container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ConnectionInfo {
    pub kind: DatabaseKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// How to reach a provisioned container from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum Connection {
    Database(ConnectionInfo),
    Application { port: u16, url: String },
}

/// Caller-facing record of a provisioned container
#[derive(Clone, Serialize, schemars::JsonSchema)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    pub role: ContainerRole,
    pub connection: Connection,
    #[schemars(with = "String")]
    pub started_at: DateTime<Utc>,
    /// Readiness was not confirmed
    pub degraded: bool,
    #[serde(skip)]
    manager: ContainerLifecycleManager,
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("connection", &self.connection)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl ContainerHandle {
    /// Short id as printed by `docker ps`
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(12)]
    }

    pub async fn logs(&self) -> Result<String> {
        self.manager.get_logs(&self.id).await
    }

    pub async fn metrics(&self) -> Result<ContainerMetrics> {
        self.manager.get_metrics(&self.id).await
    }

    /// Stop and remove the container; never fails
    pub async fn cleanup(&self) {
        self.manager.cleanup(&self.id).await
    }
}

struct Inner {
    runtime: Arc<dyn ContainerRuntime>,
    config: LifecycleConfig,
    registry: Registry,
    sequence: AtomicU64,
    http: reqwest::Client,
}

/// Owns the registry of provisioned containers. Cloning shares the registry.
#[derive(Clone)]
pub struct ContainerLifecycleManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for ContainerLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerLifecycleManager")
            .field("network", &self.inner.config.network_name)
            .field("containers", &self.inner.registry.len())
            .finish()
    }
}

impl ContainerLifecycleManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: LifecycleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                config,
                registry: Registry::new(),
                sequence: AtomicU64::new(0),
                http: reqwest::Client::new(),
            }),
        }
    }

    /// Manager backed by the local Docker daemon
    pub fn docker(config: LifecycleConfig) -> Result<Self> {
        let runtime = DockerRuntime::connect()?;
        Ok(Self::new(Arc::new(runtime), config))
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    fn runtime(&self) -> &dyn ContainerRuntime {
        self.inner.runtime.as_ref()
    }

    /// `<prefix>-<role>-<unix millis>-<seq>`
    fn container_name(&self, role: &str) -> String {
        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{}-{}",
            self.inner.config.name_prefix,
            role,
            Utc::now().timestamp_millis(),
            seq
        )
    }

    /// Create the shared network unless it exists. Returns its name.
    pub async fn ensure_network(&self) -> Result<String> {
        let name = &self.inner.config.network_name;
        if self.runtime().network_exists(name).await? {
            return Ok(name.clone());
        }
        match self.runtime().create_network(name).await {
            Ok(()) => info!(network = %name, "created network"),
            // created concurrently by another call
            Err(e @ RuntimeError::Conflict(_)) => {
                if !self.runtime().network_exists(name).await? {
                    return Err(e.into());
                }
            }
            Err(e) => return Err(e.into()),
        }
        Ok(name.clone())
    }

    /// Pull `image` unless it is present locally
    pub async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.runtime().image_exists(image).await? {
            debug!(image, "image present");
            return Ok(());
        }
        self.runtime().pull_image(image).await?;
        info!(image, "image pulled");
        Ok(())
    }

    /// Provision a database container, wait for it, and optionally seed it
    pub async fn create_test_database(&self, request: DatabaseConfig) -> Result<ContainerHandle> {
        let config = &self.inner.config;
        let kind = request.kind;
        let (Some(image), Some(container_port)) =
            (config.image_for(kind), kind.container_port())
        else {
            return Err(Error::UnsupportedDatabase(kind.to_string()));
        };
        let image = image.to_string();
        info!(%kind, %image, "creating test database container");

        let network = self.ensure_network().await?;
        self.ensure_image(&image).await?;

        let port = request.port.unwrap_or_else(|| config.default_port(kind));
        let name = self.container_name("db");
        let spec = ContainerSpec {
            name: name.clone(),
            image,
            env: kind.environment(&config.db_password, &config.db_name),
            network,
            ports: vec![PortMapping {
                container_port,
                host_port: port,
            }],
            binds: Vec::new(),
            memory: config.memory_limit,
            memory_swap: config.memory_swap,
            labels: vec![
                ("sql-testbed.role".to_string(), "database".to_string()),
                ("sql-testbed.kind".to_string(), kind.to_string()),
            ],
        };

        let id = self.runtime().create_container(&spec).await?;
        let mut entry = RegistryEntry::new(&id, &name, ContainerRole::Database);
        entry.database = Some(kind);
        self.registry().insert(entry);

        self.start(&id).await?;

        self.registry().set_state(&id, ContainerState::WaitingReady);
        if let Err(e) = self.wait_for_database(&id, kind).await {
            self.registry().set_state(&id, ContainerState::Failed);
            return Err(e);
        }
        info!(%kind, %name, "database is ready");

        if let Some(path) = &request.schema_path {
            if path.exists() {
                if let Err(e) = self.seed_database(&id, kind, path, &request).await {
                    self.registry().set_state(&id, ContainerState::Failed);
                    return Err(e);
                }
            } else {
                warn!(path = %path.display(), "schema file not found, skipping seeding");
            }
        }

        self.registry().set_state(&id, ContainerState::Ready);
        let started_at = self
            .registry()
            .get(&id)
            .map(|e| e.started_at)
            .unwrap_or_else(Utc::now);

        Ok(ContainerHandle {
            id,
            name,
            role: ContainerRole::Database,
            connection: Connection::Database(ConnectionInfo {
                kind,
                host: "localhost".to_string(),
                port,
                user: kind.user().to_string(),
                password: config.db_password.clone(),
                database: config.db_name.clone(),
            }),
            started_at,
            degraded: false,
            manager: self.clone(),
        })
    }

    /// Provision an application container serving `project_path` read-only
    pub async fn create_test_environment(
        &self,
        request: EnvironmentConfig,
    ) -> Result<ContainerHandle> {
        let config = &self.inner.config;
        info!(
            image = %request.base_image,
            port = request.test_port,
            "creating test environment container"
        );

        let network = self.ensure_network().await?;
        self.ensure_image(&request.base_image).await?;

        let db_host = request
            .db_host
            .clone()
            .or_else(|| self.registry().latest_database_name())
            .unwrap_or_else(|| "localhost".to_string());
        let mut env = vec![
            format!("DB_HOST={}", db_host),
            format!(
                "DB_NAME={}",
                request.db_name.as_deref().unwrap_or(&config.db_name)
            ),
            format!("DB_USER={}", request.db_user),
            format!(
                "DB_PASS={}",
                request.db_pass.as_deref().unwrap_or(&config.db_password)
            ),
        ];
        env.extend(request.env_vars.iter().map(|(k, v)| format!("{}={}", k, v)));

        let name = self.container_name("app");
        let spec = ContainerSpec {
            name: name.clone(),
            image: request.base_image.clone(),
            env,
            network,
            ports: vec![PortMapping {
                container_port: 80,
                host_port: request.test_port,
            }],
            binds: vec![format!(
                "{}:/var/www/html:ro",
                request.project_path.display()
            )],
            memory: config.memory_limit,
            memory_swap: config.memory_swap,
            labels: vec![("sql-testbed.role".to_string(), "application".to_string())],
        };

        let id = self.runtime().create_container(&spec).await?;
        let mut entry = RegistryEntry::new(&id, &name, ContainerRole::Application);
        entry.project_path = Some(request.project_path.clone());
        self.registry().insert(entry);

        self.start(&id).await?;

        self.registry().set_state(&id, ContainerState::WaitingReady);
        let ready = self.wait_for_server(request.test_port).await;
        if !ready {
            warn!(
                port = request.test_port,
                "server may not be ready, proceeding anyway"
            );
        }
        self.registry().set_state(&id, ContainerState::Ready);
        let started_at = self
            .registry()
            .get(&id)
            .map(|e| e.started_at)
            .unwrap_or_else(Utc::now);

        Ok(ContainerHandle {
            id,
            name,
            role: ContainerRole::Application,
            connection: Connection::Application {
                port: request.test_port,
                url: format!("http://localhost:{}", request.test_port),
            },
            started_at,
            degraded: !ready,
            manager: self.clone(),
        })
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.registry().set_state(id, ContainerState::Starting);
        if let Err(e) = self.runtime().start_container(id).await {
            self.registry().set_state(id, ContainerState::Failed);
            return Err(e.into());
        }
        Ok(())
    }

    /// Poll logs until the engine's ready line has appeared often enough
    pub async fn wait_for_database(&self, id: &str, kind: DatabaseKind) -> Result<()> {
        let Some(pattern) = kind.ready_pattern() else {
            return Ok(());
        };
        let timeout = self.inner.config.db_ready_timeout();
        let interval = self.inner.config.db_poll_interval();
        let started = Instant::now();
        info!(%kind, ?timeout, "waiting for database");

        while started.elapsed() < timeout {
            match self.runtime().logs(id, LogOptions::default()).await {
                Ok(logs) => {
                    let seen = pattern.find_iter(&logs).count();
                    if seen >= kind.ready_occurrences() {
                        return Ok(());
                    }
                    debug!(%kind, seen, "database not ready yet");
                }
                Err(e) => debug!(error = %e, "log poll failed"),
            }
            sleep(interval).await;
        }

        Err(Error::ReadinessTimeout {
            id: id.to_string(),
            kind: kind.to_string(),
            waited: timeout,
        })
    }

    /// Poll `http://localhost:port`; any status below 500 counts as ready
    pub async fn wait_for_server(&self, port: u16) -> bool {
        let timeout = self.inner.config.app_ready_timeout();
        let interval = self.inner.config.app_poll_interval();
        let url = format!("http://localhost:{}", port);
        let started = Instant::now();
        info!(%url, ?timeout, "waiting for server");

        while started.elapsed() < timeout {
            let request = self
                .inner
                .http
                .get(&url)
                .timeout(interval.max(Duration::from_millis(250)));
            match request.send().await {
                Ok(response) if response.status().as_u16() < 500 => return true,
                Ok(response) => debug!(status = %response.status(), "server not ready yet"),
                Err(e) => debug!(error = %e, "server not reachable yet"),
            }
            sleep(interval).await;
        }
        false
    }

    /// Apply the schema file, then insert generated rows. No rollback on failure.
    async fn seed_database(
        &self,
        id: &str,
        kind: DatabaseKind,
        path: &Path,
        request: &DatabaseConfig,
    ) -> Result<()> {
        let config = &self.inner.config;
        let (Some(dialect), Some(client)) = (
            kind.dialect(),
            kind.client_command(&config.db_password, &config.db_name),
        ) else {
            warn!(%kind, "schema seeding is only supported for SQL databases, skipping");
            return Ok(());
        };

        let schema_sql = input::read_to_string(path)?;
        self.run_sql(id, client.clone(), schema_sql.clone()).await?;
        info!(path = %path.display(), "schema applied");

        let schema = SchemaParser::new(dialect).parse(&schema_sql)?;
        let synth = Synthesizer::new(request.seed.unwrap_or_else(rand::random));
        let mut generator = TestDataGenerator::new(synth);
        let result = generator.generate_for(schema, request.test_data_rows);
        if result.data.total_rows() == 0 {
            return Ok(());
        }

        let inserts = format!(
            "{}\n{}\n",
            disable_constraint_checks(dialect),
            result.data.to_sql(dialect)
        );
        self.run_sql(id, client, inserts).await?;
        info!(
            rows = result.stats.total_rows,
            tables = result.stats.total_tables,
            "test data inserted"
        );
        Ok(())
    }

    async fn run_sql(&self, id: &str, client: Vec<String>, sql: String) -> Result<()> {
        let output = self.runtime().exec(id, client, Some(sql)).await?;
        if output.success() {
            return Ok(());
        }
        Err(Error::SchemaLoad {
            id: id.to_string(),
            message: format!(
                "client exited with {:?}: {}",
                output.exit_code,
                output.output.trim()
            ),
        })
    }

    /// Full log output with timestamps
    pub async fn get_logs(&self, id: &str) -> Result<String> {
        if !self.registry().contains(id) {
            return Err(Error::NotRegistered(id.to_string()));
        }
        let options = LogOptions {
            timestamps: true,
            tail: None,
        };
        Ok(self.runtime().logs(id, options).await?)
    }

    /// One resource usage sample
    pub async fn get_metrics(&self, id: &str) -> Result<ContainerMetrics> {
        if !self.registry().contains(id) {
            return Err(Error::NotRegistered(id.to_string()));
        }
        let stats = self.runtime().stats(id).await?;
        Ok(ContainerMetrics::from_stats(&stats))
    }

    /// Stop (with grace period), remove, and deregister a container.
    /// Errors are logged; unknown ids are ignored.
    pub async fn cleanup(&self, id: &str) {
        let Some(entry) = self.registry().get(id) else {
            debug!(id, "cleanup of unregistered container ignored");
            return;
        };
        let short = &id[..id.len().min(12)];
        info!(container = %short, name = %entry.name, "cleaning up container");
        self.registry().set_state(id, ContainerState::Stopping);

        match self
            .runtime()
            .stop_container(id, self.inner.config.stop_timeout())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(container = %short, error = %e, "stop failed, removing anyway"),
        }

        match self.runtime().remove_container(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(container = %short, error = %e, "cleanup error");
                self.registry().set_state(id, ContainerState::Failed);
                return;
            }
        }

        self.registry().set_state(id, ContainerState::Removed);
        self.registry().remove(id);
        info!(container = %short, "container cleaned up");
    }

    /// Drive `provision` until it finishes or `shutdown` completes first.
    /// Every registered container is cleaned up when provisioning fails or
    /// is interrupted.
    pub async fn provision_until<T, F, S>(&self, provision: F, shutdown: S) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        S: Future<Output = ()>,
    {
        tokio::select! {
            result = provision => {
                if result.is_err() {
                    self.cleanup_all().await;
                }
                result
            }
            () = shutdown => {
                warn!("interrupted during provisioning, cleaning up");
                self.cleanup_all().await;
                Err(Error::Interrupted)
            }
        }
    }

    /// Clean up every registered container concurrently
    pub async fn cleanup_all(&self) {
        let ids = self.registry().ids();
        if ids.is_empty() {
            return;
        }
        info!(count = ids.len(), "cleaning up all test containers");
        futures::future::join_all(ids.iter().map(|id| self.cleanup(id))).await;
    }
}

/// Statement turning off foreign-key enforcement for the seeding session
fn disable_constraint_checks(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => "SET FOREIGN_KEY_CHECKS=0;",
        Dialect::Postgres => "SET session_replication_role = replica;",
        Dialect::Sqlite => "PRAGMA foreign_keys = OFF;",
    }
}
