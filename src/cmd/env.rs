use super::db::{connect, database_request, hold_until_interrupted, report};
use super::shutdown::shutdown_signal;
use sql_testbed::config::Config;
use sql_testbed::container::{DatabaseKind, EnvironmentConfig};
use std::path::PathBuf;

pub struct EnvOptions {
    pub project: PathBuf,
    pub image: String,
    pub port: u16,
    pub db: Option<String>,
    pub schema: Option<PathBuf>,
    pub rows: Option<usize>,
    pub env_vars: Vec<(String, String)>,
    pub json: bool,
}

pub async fn run(options: EnvOptions, config: Config) -> anyhow::Result<()> {
    if !options.project.is_dir() {
        anyhow::bail!(
            "project directory does not exist: {}",
            options.project.display()
        );
    }
    let project = options.project.canonicalize()?;
    let kind = options
        .db
        .as_deref()
        .map(str::parse::<DatabaseKind>)
        .transpose()?;

    let database = kind.map(|kind| {
        database_request(kind, options.schema, None, options.rows, None, &config)
    });
    let mut environment = EnvironmentConfig::new(project)
        .with_image(options.image)
        .with_port(options.port);
    for (key, value) in options.env_vars {
        environment = environment.with_env(key, value);
    }

    let manager = connect(&config).await?;
    let provision = async {
        let mut handles = Vec::new();
        if let Some(request) = database {
            handles.push(manager.create_test_database(request).await?);
        }
        handles.push(manager.create_test_environment(environment).await?);
        Ok::<_, sql_testbed::Error>(handles)
    };
    let handles = manager
        .provision_until(provision, shutdown_signal())
        .await?;

    report(&handles, options.json)?;
    hold_until_interrupted(&manager).await
}
