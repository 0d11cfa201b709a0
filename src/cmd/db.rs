use schemars::JsonSchema;
use serde::Serialize;
use sql_testbed::config::Config;
use sql_testbed::container::{
    AvailabilityChecker, Connection, ContainerHandle, ContainerLifecycleManager, DatabaseConfig,
    DatabaseKind,
};
use sql_testbed::Error;
use std::path::PathBuf;

use super::shutdown::shutdown_signal;

/// JSON output for the db and env commands
#[derive(Serialize, JsonSchema)]
pub(crate) struct ProvisionJsonOutput {
    pub(crate) containers: Vec<ContainerHandle>,
}

pub async fn run(
    kind: String,
    schema: Option<PathBuf>,
    port: Option<u16>,
    rows: Option<usize>,
    seed: Option<u64>,
    config: Config,
    json: bool,
) -> anyhow::Result<()> {
    let kind: DatabaseKind = kind.parse()?;
    let request = database_request(kind, schema, port, rows, seed, &config);

    let manager = connect(&config).await?;
    let handle = manager
        .provision_until(manager.create_test_database(request), shutdown_signal())
        .await?;

    report(&[handle], json)?;
    hold_until_interrupted(&manager).await
}

pub(crate) fn database_request(
    kind: DatabaseKind,
    schema: Option<PathBuf>,
    port: Option<u16>,
    rows: Option<usize>,
    seed: Option<u64>,
    config: &Config,
) -> DatabaseConfig {
    let mut request =
        DatabaseConfig::new(kind).with_rows(rows.unwrap_or(config.generation.rows));
    if let Some(path) = schema {
        request = request.with_schema(path);
    }
    if let Some(port) = port {
        request = request.with_port(port);
    }
    if let Some(seed) = seed.or(config.generation.seed) {
        request = request.with_seed(seed);
    }
    request
}

/// Verify the runtime, then connect a manager to it. An unavailable runtime
/// prints the remediation text before failing.
pub(crate) async fn connect(config: &Config) -> anyhow::Result<ContainerLifecycleManager> {
    match AvailabilityChecker::default().require_ready().await {
        Ok(report) => {
            tracing::debug!(version = ?report.version, "container runtime ready");
        }
        Err(Error::RuntimeUnavailable {
            message,
            remediation,
        }) => {
            eprint!("{}", remediation);
            anyhow::bail!("container runtime unavailable: {}", message);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(ContainerLifecycleManager::docker(config.lifecycle.clone())?)
}

pub(crate) fn report(handles: &[ContainerHandle], json: bool) -> anyhow::Result<()> {
    if json {
        let output = ProvisionJsonOutput {
            containers: handles.to_vec(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for handle in handles {
        println!("✓ {} {} ({})", handle.role, handle.name, handle.short_id());
        match &handle.connection {
            Connection::Database(info) => {
                println!("  Type:     {}", info.kind);
                println!("  Host:     {}:{}", info.host, info.port);
                println!("  User:     {}", info.user);
                println!("  Password: {}", info.password);
                println!("  Database: {}", info.database);
            }
            Connection::Application { url, .. } => {
                println!("  URL:      {}", url);
                if handle.degraded {
                    println!("  Warning:  server did not respond before the readiness timeout");
                }
            }
        }
    }
    Ok(())
}

/// Keep containers running until Ctrl-C or SIGTERM, then clean up every container
pub(crate) async fn hold_until_interrupted(
    manager: &ContainerLifecycleManager,
) -> anyhow::Result<()> {
    eprintln!("\nPress Ctrl-C to stop and remove the containers.");
    shutdown_signal().await;
    eprintln!("Cleaning up...");
    manager.cleanup_all().await;
    Ok(())
}
