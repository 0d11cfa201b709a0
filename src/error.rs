//! Error types for schema parsing, data generation and container provisioning.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported schema dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Container runtime unavailable: {message}")]
    RuntimeUnavailable { message: String, remediation: String },

    #[error("Unsupported database type: {0}")]
    UnsupportedDatabase(String),

    #[error("{kind} container {id} not ready after {waited:?}")]
    ReadinessTimeout {
        id: String,
        kind: String,
        waited: Duration,
    },

    #[error("Failed to load schema into container {id}: {message}")]
    SchemaLoad { id: String, message: String },

    #[error("Container {0} is not registered")]
    NotRegistered(String),

    #[error("Interrupted before provisioning finished")]
    Interrupted,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Failures reported by a [`crate::container::ContainerRuntime`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Container runtime error: {0}")]
    Api(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}
