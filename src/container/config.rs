//! Provisioning requests and lifecycle settings.

use crate::error::Error;
use crate::schema::Dialect;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// The server's own line on a TCP port. The entrypoint's init server reports
/// `port: 0` and the X Plugin prints a similar line, so neither matches.
static MYSQL_READY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\b(?:mysqld|mariadbd): ready for connections\b.*\bport: [1-9][0-9]*").unwrap()
});

static POSTGRES_READY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)database system is ready to accept connections").unwrap());

static MONGODB_READY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)waiting for connections").unwrap());

/// Database engine of a test database container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mysql,
    Postgres,
    Mongodb,
    /// File-based; never provisioned as a container
    Sqlite,
}

impl DatabaseKind {
    /// Port the engine listens on inside the container
    pub fn container_port(&self) -> Option<u16> {
        match self {
            DatabaseKind::Mysql => Some(3306),
            DatabaseKind::Postgres => Some(5432),
            DatabaseKind::Mongodb => Some(27017),
            DatabaseKind::Sqlite => None,
        }
    }

    /// Administrative user created by the image
    pub fn user(&self) -> &'static str {
        match self {
            DatabaseKind::Postgres => "postgres",
            _ => "root",
        }
    }

    /// Log line printed once the server accepts connections
    pub fn ready_pattern(&self) -> Option<&'static Regex> {
        match self {
            DatabaseKind::Mysql => Some(&MYSQL_READY),
            DatabaseKind::Postgres => Some(&POSTGRES_READY),
            DatabaseKind::Mongodb => Some(&MONGODB_READY),
            DatabaseKind::Sqlite => None,
        }
    }

    /// How many times the ready line appears during first boot. The
    /// PostgreSQL entrypoint starts a socket-only server for initialisation,
    /// stops it, then starts the real one, and both print the same line.
    pub fn ready_occurrences(&self) -> usize {
        match self {
            DatabaseKind::Postgres => 2,
            _ => 1,
        }
    }

    /// SQL dialect used to seed the database, if it speaks SQL
    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            DatabaseKind::Mysql => Some(Dialect::MySql),
            DatabaseKind::Postgres => Some(Dialect::Postgres),
            DatabaseKind::Sqlite => Some(Dialect::Sqlite),
            DatabaseKind::Mongodb => None,
        }
    }

    /// Image environment creating the credentials and database
    pub fn environment(&self, password: &str, database: &str) -> Vec<String> {
        match self {
            DatabaseKind::Mysql => vec![
                format!("MYSQL_ROOT_PASSWORD={}", password),
                format!("MYSQL_DATABASE={}", database),
            ],
            DatabaseKind::Postgres => vec![
                format!("POSTGRES_PASSWORD={}", password),
                format!("POSTGRES_DB={}", database),
            ],
            DatabaseKind::Mongodb => vec![
                format!("MONGO_INITDB_ROOT_USERNAME={}", self.user()),
                format!("MONGO_INITDB_ROOT_PASSWORD={}", password),
                format!("MONGO_INITDB_DATABASE={}", database),
            ],
            DatabaseKind::Sqlite => Vec::new(),
        }
    }

    /// Client command that reads SQL from stdin inside the container
    pub fn client_command(&self, password: &str, database: &str) -> Option<Vec<String>> {
        match self {
            DatabaseKind::Mysql => Some(vec![
                "mysql".to_string(),
                format!("-u{}", self.user()),
                format!("-p{}", password),
                database.to_string(),
            ]),
            DatabaseKind::Postgres => Some(vec![
                "psql".to_string(),
                "-U".to_string(),
                self.user().to_string(),
                "-d".to_string(),
                database.to_string(),
                "-v".to_string(),
                "ON_ERROR_STOP=1".to_string(),
                "-q".to_string(),
            ]),
            _ => None,
        }
    }
}

impl FromStr for DatabaseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseKind::Mysql),
            "postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
            "mongodb" | "mongo" => Ok(DatabaseKind::Mongodb),
            "sqlite" => Ok(DatabaseKind::Sqlite),
            _ => Err(Error::UnsupportedDatabase(s.to_string())),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Mysql => write!(f, "mysql"),
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::Mongodb => write!(f, "mongodb"),
            DatabaseKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Request for a test database container
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub kind: DatabaseKind,
    /// Schema to apply and seed once the server is ready
    pub schema_path: Option<PathBuf>,
    /// Host port; defaults per engine
    pub port: Option<u16>,
    pub test_data_rows: usize,
    /// Seed for generated rows
    pub seed: Option<u64>,
}

impl DatabaseConfig {
    pub fn new(kind: DatabaseKind) -> Self {
        Self {
            kind,
            schema_path: None,
            port: None,
            test_data_rows: 100,
            seed: None,
        }
    }

    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.test_data_rows = rows;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Request for an application container serving a project directory
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    /// Host directory mounted read-only at `/var/www/html`
    pub project_path: PathBuf,
    pub base_image: String,
    /// Host port bound to the container's port 80
    pub test_port: u16,
    /// Database host; defaults to the latest database container, else localhost
    pub db_host: Option<String>,
    pub db_name: Option<String>,
    pub db_user: String,
    pub db_pass: Option<String>,
    /// Extra `KEY=VALUE` environment, in order
    pub env_vars: Vec<(String, String)>,
}

impl EnvironmentConfig {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            base_image: "php:8.2-apache".to_string(),
            test_port: 8888,
            db_host: None,
            db_name: None,
            db_user: "root".to_string(),
            db_pass: None,
            env_vars: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.base_image = image.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.test_port = port;
        self
    }

    pub fn with_db_host(mut self, host: impl Into<String>) -> Self {
        self.db_host = Some(host.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }
}

/// Images per database engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseImages {
    pub mysql: String,
    pub postgres: String,
    pub mongodb: String,
}

impl Default for DatabaseImages {
    fn default() -> Self {
        Self {
            mysql: "mysql:8.0".to_string(),
            postgres: "postgres:15".to_string(),
            mongodb: "mongo:7".to_string(),
        }
    }
}

/// Default host ports per database engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabasePorts {
    pub mysql: u16,
    pub postgres: u16,
    pub mongodb: u16,
}

impl Default for DatabasePorts {
    fn default() -> Self {
        Self {
            mysql: 13306,
            postgres: 15432,
            mongodb: 17017,
        }
    }
}

/// Settings shared by every container the manager provisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Shared bridge network
    pub network_name: String,
    /// Container name prefix
    pub name_prefix: String,
    /// Memory limit in bytes
    pub memory_limit: i64,
    /// Memory plus swap limit in bytes
    pub memory_swap: i64,
    pub db_ready_timeout_ms: u64,
    pub db_poll_interval_ms: u64,
    pub app_ready_timeout_ms: u64,
    pub app_poll_interval_ms: u64,
    /// Grace period before a stopping container is killed
    pub stop_timeout_secs: u64,
    pub db_password: String,
    pub db_name: String,
    pub images: DatabaseImages,
    pub ports: DatabasePorts,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            network_name: "sql-testbed-network".to_string(),
            name_prefix: "sql-testbed".to_string(),
            memory_limit: 512 * 1024 * 1024,
            memory_swap: 1024 * 1024 * 1024,
            db_ready_timeout_ms: 30_000,
            db_poll_interval_ms: 1_000,
            app_ready_timeout_ms: 10_000,
            app_poll_interval_ms: 500,
            stop_timeout_secs: 10,
            db_password: "test123".to_string(),
            db_name: "testbed".to_string(),
            images: DatabaseImages::default(),
            ports: DatabasePorts::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn image_for(&self, kind: DatabaseKind) -> Option<&str> {
        match kind {
            DatabaseKind::Mysql => Some(&self.images.mysql),
            DatabaseKind::Postgres => Some(&self.images.postgres),
            DatabaseKind::Mongodb => Some(&self.images.mongodb),
            DatabaseKind::Sqlite => None,
        }
    }

    pub fn default_port(&self, kind: DatabaseKind) -> u16 {
        match kind {
            DatabaseKind::Postgres => self.ports.postgres,
            DatabaseKind::Mongodb => self.ports.mongodb,
            _ => self.ports.mysql,
        }
    }

    pub fn db_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.db_ready_timeout_ms)
    }

    pub fn db_poll_interval(&self) -> Duration {
        Duration::from_millis(self.db_poll_interval_ms)
    }

    pub fn app_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.app_ready_timeout_ms)
    }

    pub fn app_poll_interval(&self) -> Duration {
        Duration::from_millis(self.app_poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("MariaDB".parse::<DatabaseKind>().unwrap(), DatabaseKind::Mysql);
        assert_eq!("mongo".parse::<DatabaseKind>().unwrap(), DatabaseKind::Mongodb);
        assert!(matches!(
            "oracle".parse::<DatabaseKind>(),
            Err(Error::UnsupportedDatabase(_))
        ));
    }

    #[test]
    fn test_ready_patterns() {
        let mysql = DatabaseKind::Mysql.ready_pattern().unwrap();
        assert!(mysql.is_match(
            "[Server] /usr/sbin/mysqld: ready for connections. Version: '8.0.36'  \
             socket: '/var/run/mysqld/mysqld.sock'  port: 3306  MySQL Community Server - GPL."
        ));
        assert!(!mysql.is_match(
            "[Server] /usr/sbin/mysqld: ready for connections. Version: '8.0.36'  \
             socket: '/var/run/mysqld/mysqld.sock'  port: 0  MySQL Community Server - GPL."
        ));
        assert!(!mysql.is_match(
            "[Server] X Plugin ready for connections. Bind-address: '::' port: 33060, \
             socket: /var/run/mysqld/mysqlx.sock"
        ));
        let mongo = DatabaseKind::Mongodb.ready_pattern().unwrap();
        assert!(mongo.is_match("{\"msg\":\"Waiting for connections\"}"));
        assert!(DatabaseKind::Sqlite.ready_pattern().is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: LifecycleConfig =
            serde_yaml_ng::from_str("network_name: ci-net\nports:\n  mysql: 3307\n").unwrap();
        assert_eq!(config.network_name, "ci-net");
        assert_eq!(config.ports.mysql, 3307);
        assert_eq!(config.ports.postgres, 15432);
        assert_eq!(config.memory_limit, 512 * 1024 * 1024);
    }
}
