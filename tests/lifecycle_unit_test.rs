//! Unit tests for the container lifecycle manager, run against an in-memory runtime.

use async_trait::async_trait;
use parking_lot::Mutex;
use sql_testbed::container::{
    Connection, ContainerLifecycleManager, ContainerRole, ContainerRuntime, ContainerSpec,
    ContainerState, DatabaseConfig, DatabaseKind, EnvironmentConfig, ExecOutput, LifecycleConfig,
    LogOptions, NetworkIo, RuntimeResult, StatsSnapshot,
};
use sql_testbed::{Error, RuntimeError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// First boot of mysql:8.0 up to the point where only the init server runs
const MYSQL_INIT_SERVER_LOG: &str = "\
    [Note] [Entrypoint]: Temporary server started.\n\
    [System] [MY-011323] [Server] X Plugin ready for connections. \
    Socket: /var/run/mysqld/mysqlx.sock\n\
    [System] [MY-010931] [Server] /usr/sbin/mysqld: ready for connections. \
    Version: '8.0.36'  socket: '/var/run/mysqld/mysqld.sock'  port: 0  \
    MySQL Community Server - GPL.\n";

/// Complete first boot of mysql:8.0
const MYSQL_BOOT_LOG: &str = "\
    [Note] [Entrypoint]: Temporary server started.\n\
    [System] [MY-011323] [Server] X Plugin ready for connections. \
    Socket: /var/run/mysqld/mysqlx.sock\n\
    [System] [MY-010931] [Server] /usr/sbin/mysqld: ready for connections. \
    Version: '8.0.36'  socket: '/var/run/mysqld/mysqld.sock'  port: 0  \
    MySQL Community Server - GPL.\n\
    [Note] [Entrypoint]: MySQL init process done. Ready for start up.\n\
    [System] [MY-011323] [Server] X Plugin ready for connections. \
    Bind-address: '::' port: 33060, socket: /var/run/mysqld/mysqlx.sock\n\
    [System] [MY-010931] [Server] /usr/sbin/mysqld: ready for connections. \
    Version: '8.0.36'  socket: '/var/run/mysqld/mysqld.sock'  port: 3306  \
    MySQL Community Server - GPL.\n";

#[derive(Debug, Clone)]
struct FakeContainer {
    spec: ContainerSpec,
    running: bool,
}

#[derive(Default)]
struct FakeState {
    networks: Vec<String>,
    network_creates: usize,
    images: Vec<String>,
    pulls: Vec<String>,
    containers: BTreeMap<String, FakeContainer>,
    next_id: usize,
    execs: Vec<(String, Vec<String>, Option<String>)>,
    stopped: Vec<(String, Duration)>,
}

/// In-memory runtime; behaviour knobs are set before handing it to a manager
#[derive(Default)]
struct FakeRuntime {
    state: Mutex<FakeState>,
    logs: Mutex<String>,
    fail_start: bool,
    fail_remove: bool,
    conflict_on_network_create: bool,
    exec_exit_code: i64,
}

impl FakeRuntime {
    fn with_logs(logs: &str) -> Self {
        let runtime = Self::default();
        *runtime.logs.lock() = logs.to_string();
        runtime
    }

    fn container(&self, id: &str) -> Option<FakeContainer> {
        self.state.lock().containers.get(id).cloned()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn network_exists(&self, name: &str) -> RuntimeResult<bool> {
        Ok(self.state.lock().networks.iter().any(|n| n == name))
    }

    async fn create_network(&self, name: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        state.network_creates += 1;
        if self.conflict_on_network_create {
            // another caller won the race
            state.networks.push(name.to_string());
            return Err(RuntimeError::Conflict(format!("network {} exists", name)));
        }
        state.networks.push(name.to_string());
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> RuntimeResult<bool> {
        Ok(self.state.lock().images.iter().any(|i| i == image))
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        state.pulls.push(image.to_string());
        state.images.push(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                spec: spec.clone(),
                running: false,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        if self.fail_start {
            return Err(RuntimeError::Api("port is already allocated".to_string()));
        }
        match self.state.lock().containers.get_mut(id) {
            Some(c) => {
                c.running = true;
                Ok(())
            }
            None => Err(RuntimeError::NotFound(id.to_string())),
        }
    }

    async fn logs(&self, id: &str, options: LogOptions) -> RuntimeResult<String> {
        if !self.state.lock().containers.contains_key(id) {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        let logs = self.logs.lock().clone();
        if options.timestamps {
            Ok(logs
                .lines()
                .map(|l| format!("2024-01-01T00:00:00Z {}\n", l))
                .collect())
        } else {
            Ok(logs)
        }
    }

    async fn stats(&self, id: &str) -> RuntimeResult<StatsSnapshot> {
        if !self.state.lock().containers.contains_key(id) {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        Ok(StatsSnapshot {
            cpu_total: 300,
            precpu_total: 100,
            system_cpu: Some(2_000),
            presystem_cpu: Some(1_000),
            online_cpus: Some(2),
            memory_usage: Some(128),
            memory_limit: Some(512),
            networks: vec![(
                "eth0".to_string(),
                NetworkIo {
                    rx_bytes: 10,
                    tx_bytes: 20,
                },
            )],
        })
    }

    async fn exec(
        &self,
        id: &str,
        cmd: Vec<String>,
        stdin: Option<String>,
    ) -> RuntimeResult<ExecOutput> {
        self.state.lock().execs.push((id.to_string(), cmd, stdin));
        Ok(ExecOutput {
            exit_code: Some(self.exec_exit_code),
            output: if self.exec_exit_code == 0 {
                String::new()
            } else {
                "ERROR 1064 (42000): syntax error".to_string()
            },
        })
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        state.stopped.push((id.to_string(), grace));
        match state.containers.get_mut(id) {
            Some(c) => {
                c.running = false;
                Ok(())
            }
            None => Err(RuntimeError::NotFound(id.to_string())),
        }
    }

    async fn remove_container(&self, id: &str) -> RuntimeResult<()> {
        if self.fail_remove {
            return Err(RuntimeError::Api("device or resource busy".to_string()));
        }
        match self.state.lock().containers.remove(id) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::NotFound(id.to_string())),
        }
    }
}

fn fast_config() -> LifecycleConfig {
    LifecycleConfig {
        db_ready_timeout_ms: 300,
        db_poll_interval_ms: 10,
        app_ready_timeout_ms: 300,
        app_poll_interval_ms: 20,
        ..LifecycleConfig::default()
    }
}

fn manager_with(runtime: FakeRuntime) -> (ContainerLifecycleManager, Arc<FakeRuntime>) {
    let runtime = Arc::new(runtime);
    let manager = ContainerLifecycleManager::new(runtime.clone(), fast_config());
    (manager, runtime)
}

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Minimal HTTP server answering every request with `status`
async fn serve_status(status: u16) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    port
}

/// A port with nothing listening on it
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

mod database_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_cleanup_leaves_network() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));

        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();
        assert_eq!(handle.role, ContainerRole::Database);
        assert!(!handle.degraded);
        assert!(handle.name.starts_with("sql-testbed-db-"));
        assert_eq!(manager.registry().state(&handle.id), Some(ContainerState::Ready));

        let Connection::Database(info) = &handle.connection else {
            panic!("expected database connection info");
        };
        assert_eq!(info.port, 13306);
        assert_eq!(info.user, "root");
        assert_eq!(info.database, "testbed");

        let container = runtime.container(&handle.id).unwrap();
        assert!(container.running);
        assert_eq!(container.spec.image, "mysql:8.0");
        assert_eq!(container.spec.network, "sql-testbed-network");
        assert_eq!(container.spec.memory, 512 * 1024 * 1024);
        assert_eq!(container.spec.memory_swap, 1024 * 1024 * 1024);
        assert_eq!(container.spec.ports[0].container_port, 3306);
        assert!(container
            .spec
            .env
            .contains(&"MYSQL_ROOT_PASSWORD=test123".to_string()));

        handle.cleanup().await;

        assert!(manager.registry().is_empty());
        assert!(runtime.container(&handle.id).is_none());
        let state = runtime.state.lock();
        assert_eq!(state.networks, vec!["sql-testbed-network"]);
        assert_eq!(state.stopped[0].1, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_network_and_image_are_reused() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let a = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();
        let b = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql).with_port(23306))
            .await
            .unwrap();
        assert_ne!(a.name, b.name);
        {
            let state = runtime.state.lock();
            assert_eq!(state.network_creates, 1);
            assert_eq!(state.pulls, vec!["mysql:8.0"]);
        }
        assert_eq!(manager.registry().ids(), vec![a.id.clone(), b.id.clone()]);

        manager.cleanup_all().await;
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
    }

    #[tokio::test]
    async fn test_network_create_conflict_is_tolerated() {
        let runtime = FakeRuntime {
            conflict_on_network_create: true,
            ..FakeRuntime::with_logs(MYSQL_BOOT_LOG)
        };
        let (manager, _runtime) = manager_with(runtime);
        assert_eq!(manager.ensure_network().await.unwrap(), "sql-testbed-network");
    }

    #[tokio::test]
    async fn test_init_server_is_not_ready() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_INIT_SERVER_LOG));
        let result = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await;
        let id = match result {
            Err(Error::ReadinessTimeout { id, kind, waited }) => {
                assert_eq!(kind, "mysql");
                assert_eq!(waited, Duration::from_millis(300));
                id
            }
            other => panic!("expected a readiness timeout, got {:?}", other),
        };
        assert_eq!(manager.registry().state(&id), Some(ContainerState::Failed));

        manager.cleanup_all().await;
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
    }

    #[tokio::test]
    async fn test_mongodb_needs_one_ready_line() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(
            "{\"msg\":\"Waiting for connections\",\"attr\":{\"port\":27017}}\n",
        ));
        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mongodb))
            .await
            .unwrap();
        let container = runtime.container(&handle.id).unwrap();
        assert_eq!(container.spec.image, "mongo:7");
        assert_eq!(container.spec.ports[0].host_port, 17017);
        handle.cleanup().await;
    }

    #[tokio::test]
    async fn test_sqlite_is_not_provisioned() {
        let (manager, runtime) = manager_with(FakeRuntime::default());
        let result = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Sqlite))
            .await;
        assert!(matches!(result, Err(Error::UnsupportedDatabase(_))));
        assert!(runtime.state.lock().containers.is_empty());
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_keeps_entry_for_cleanup() {
        let runtime = FakeRuntime {
            fail_start: true,
            ..FakeRuntime::default()
        };
        let (manager, runtime) = manager_with(runtime);
        let result = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Postgres))
            .await;
        assert!(matches!(result, Err(Error::Runtime(RuntimeError::Api(_)))));
        assert_eq!(manager.registry().len(), 1);

        manager.cleanup_all().await;
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
    }

    #[tokio::test]
    async fn test_schema_and_data_are_loaded() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let request = DatabaseConfig::new(DatabaseKind::Mysql)
            .with_schema(fixture("shop.sql"))
            .with_rows(3)
            .with_seed(42);
        let handle = manager.create_test_database(request).await.unwrap();

        let execs = runtime.state.lock().execs.clone();
        assert_eq!(execs.len(), 2);
        let (id, cmd, schema_sql) = &execs[0];
        assert_eq!(id, &handle.id);
        assert_eq!(cmd[0], "mysql");
        assert!(schema_sql.as_deref().unwrap().contains("CREATE TABLE users"));

        let data_sql = execs[1].2.as_deref().unwrap();
        assert!(data_sql.starts_with("SET FOREIGN_KEY_CHECKS=0;"));
        assert_eq!(data_sql.matches("INSERT INTO `users`").count(), 3);
        assert_eq!(data_sql.matches("INSERT INTO `order_items`").count(), 3);
        handle.cleanup().await;
    }

    #[tokio::test]
    async fn test_failed_schema_load_is_reported() {
        let runtime = FakeRuntime {
            exec_exit_code: 1,
            ..FakeRuntime::with_logs(MYSQL_BOOT_LOG)
        };
        let (manager, _runtime) = manager_with(runtime);
        let request = DatabaseConfig::new(DatabaseKind::Mysql).with_schema(fixture("shop.sql"));
        match manager.create_test_database(request).await {
            Err(Error::SchemaLoad { message, .. }) => assert!(message.contains("syntax error")),
            other => panic!("expected a schema load error, got {:?}", other),
        }
        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_missing_schema_file_skips_seeding() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let request =
            DatabaseConfig::new(DatabaseKind::Mysql).with_schema("/nonexistent/schema.sql");
        let handle = manager.create_test_database(request).await.unwrap();
        assert!(runtime.state.lock().execs.is_empty());
        handle.cleanup().await;
    }
}

mod environment_tests {
    use super::*;

    #[tokio::test]
    async fn test_unresponsive_server_is_degraded() {
        let (manager, runtime) = manager_with(FakeRuntime::default());
        let port = closed_port().await;
        let project = tempfile::tempdir().unwrap();

        let request = EnvironmentConfig::new(project.path())
            .with_port(port)
            .with_env("APP_ENV", "testing");
        let handle = manager.create_test_environment(request).await.unwrap();

        assert!(handle.degraded);
        assert_eq!(handle.role, ContainerRole::Application);
        assert_eq!(manager.registry().state(&handle.id), Some(ContainerState::Ready));
        let Connection::Application { url, .. } = &handle.connection else {
            panic!("expected an application url");
        };
        assert_eq!(url, &format!("http://localhost:{}", port));

        let spec = runtime.container(&handle.id).unwrap().spec;
        assert_eq!(spec.image, "php:8.2-apache");
        assert_eq!(
            spec.binds,
            vec![format!("{}:/var/www/html:ro", project.path().display())]
        );
        assert_eq!(spec.ports[0].container_port, 80);
        assert_eq!(spec.ports[0].host_port, port);
        assert_eq!(
            spec.env,
            vec![
                "DB_HOST=localhost",
                "DB_NAME=testbed",
                "DB_USER=root",
                "DB_PASS=test123",
                "APP_ENV=testing",
            ]
        );

        handle.cleanup().await;
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_client_errors_count_as_ready() {
        let (manager, _runtime) = manager_with(FakeRuntime::default());
        let port = serve_status(404).await;
        let project = tempfile::tempdir().unwrap();
        let handle = manager
            .create_test_environment(EnvironmentConfig::new(project.path()).with_port(port))
            .await
            .unwrap();
        assert!(!handle.degraded);
        handle.cleanup().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_not_ready() {
        let (manager, _runtime) = manager_with(FakeRuntime::default());
        let port = serve_status(503).await;
        assert!(!manager.wait_for_server(port).await);
    }

    #[tokio::test]
    async fn test_db_host_defaults_to_latest_database() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let db = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();
        let project = tempfile::tempdir().unwrap();
        let port = closed_port().await;
        let app = manager
            .create_test_environment(EnvironmentConfig::new(project.path()).with_port(port))
            .await
            .unwrap();

        let env = runtime.container(&app.id).unwrap().spec.env;
        assert_eq!(env[0], format!("DB_HOST={}", db.name));

        let explicit = manager
            .create_test_environment(
                EnvironmentConfig::new(project.path())
                    .with_port(port)
                    .with_db_host("db.internal"),
            )
            .await
            .unwrap();
        let env = runtime.container(&explicit.id).unwrap().spec.env;
        assert_eq!(env[0], "DB_HOST=db.internal");

        manager.cleanup_all().await;
        assert!(manager.registry().is_empty());
    }
}

mod observation_tests {
    use super::*;

    #[tokio::test]
    async fn test_logs_and_metrics() {
        let (manager, _runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();

        let logs = handle.logs().await.unwrap();
        assert!(logs.starts_with("2024-01-01T00:00:00Z"));
        assert_eq!(logs.lines().count(), MYSQL_BOOT_LOG.lines().count());

        let metrics = handle.metrics().await.unwrap();
        // (200 / 1000) * 2 cpus * 100
        assert!((metrics.cpu_percent - 40.0).abs() < 1e-9);
        assert!((metrics.memory.percent - 25.0).abs() < 1e-9);
        assert_eq!(metrics.network["eth0"].tx_bytes, 20);

        handle.cleanup().await;
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_registered() {
        let (manager, _runtime) = manager_with(FakeRuntime::default());
        assert!(matches!(
            manager.get_logs("deadbeef").await,
            Err(Error::NotRegistered(_))
        ));
        assert!(matches!(
            manager.get_metrics("deadbeef").await,
            Err(Error::NotRegistered(_))
        ));
        // no-op
        manager.cleanup("deadbeef").await;
    }
}

mod cleanup_tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();
        handle.cleanup().await;
        handle.cleanup().await;
        assert!(manager.registry().is_empty());
        assert_eq!(runtime.state.lock().stopped.len(), 1);
    }

    #[tokio::test]
    async fn test_container_removed_externally_counts_as_removed() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();
        runtime.state.lock().containers.clear();

        handle.cleanup().await;
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_entry() {
        let runtime = FakeRuntime {
            fail_remove: true,
            ..FakeRuntime::with_logs(MYSQL_BOOT_LOG)
        };
        let (manager, _runtime) = manager_with(runtime);
        let handle = manager
            .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql))
            .await
            .unwrap();

        handle.cleanup().await;
        assert_eq!(manager.registry().state(&handle.id), Some(ContainerState::Failed));
    }

    #[tokio::test]
    async fn test_interrupt_during_provisioning_removes_containers() {
        let runtime = Arc::new(FakeRuntime::with_logs(MYSQL_INIT_SERVER_LOG));
        let config = LifecycleConfig {
            db_ready_timeout_ms: 60_000,
            ..fast_config()
        };
        let manager = ContainerLifecycleManager::new(runtime.clone(), config);

        let started = tokio::time::Instant::now();
        let result = manager
            .provision_until(
                manager.create_test_database(DatabaseConfig::new(DatabaseKind::Mysql)),
                tokio::time::sleep(Duration::from_millis(50)),
            )
            .await;
        assert!(matches!(result, Err(Error::Interrupted)));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
        assert_eq!(runtime.state.lock().stopped.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_provisioning_cleans_up() {
        let runtime = FakeRuntime {
            fail_start: true,
            ..FakeRuntime::default()
        };
        let (manager, runtime) = manager_with(runtime);
        let result = manager
            .provision_until(
                manager.create_test_database(DatabaseConfig::new(DatabaseKind::Postgres)),
                std::future::pending::<()>(),
            )
            .await;
        assert!(matches!(result, Err(Error::Runtime(_))));
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
    }

    #[tokio::test]
    async fn test_finished_provisioning_keeps_containers() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        let handle = manager
            .provision_until(
                manager.create_test_database(DatabaseConfig::new(DatabaseKind::Mysql)),
                std::future::pending::<()>(),
            )
            .await
            .unwrap();
        assert_eq!(manager.registry().len(), 1);
        assert!(runtime.container(&handle.id).is_some());
        manager.cleanup_all().await;
    }

    #[tokio::test]
    async fn test_cleanup_all_handles_many_containers() {
        let (manager, runtime) = manager_with(FakeRuntime::with_logs(MYSQL_BOOT_LOG));
        for i in 0..5 {
            manager
                .create_test_database(DatabaseConfig::new(DatabaseKind::Mysql).with_port(20000 + i))
                .await
                .unwrap();
        }
        assert_eq!(manager.registry().len(), 5);
        manager.cleanup_all().await;
        assert!(manager.registry().is_empty());
        assert!(runtime.state.lock().containers.is_empty());
        assert_eq!(runtime.state.lock().networks.len(), 1);
    }
}
