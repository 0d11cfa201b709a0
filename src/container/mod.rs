//! Ephemeral container environments for testing.
//!
//! This module provides:
//! - An availability check for the container runtime CLI and daemon
//! - The [`ContainerRuntime`] abstraction and its Docker Engine implementation
//! - [`ContainerLifecycleManager`], which provisions database and application
//!   containers, waits for readiness, seeds schemas, and cleans up

mod availability;
mod config;
mod docker;
mod manager;
mod metrics;
mod registry;
mod runtime;

pub use availability::{
    format_error_message, get_install_instructions, AvailabilityChecker, AvailabilityReport,
    InstallInstructions, Platform,
};
pub use config::{
    DatabaseConfig, DatabaseImages, DatabaseKind, DatabasePorts, EnvironmentConfig,
    LifecycleConfig,
};
pub use docker::DockerRuntime;
pub use manager::{Connection, ConnectionInfo, ContainerHandle, ContainerLifecycleManager};
pub use metrics::{cpu_percent, memory_percent, ContainerMetrics, MemoryUsage};
pub use registry::{ContainerRole, ContainerState, Registry, RegistryEntry};
pub use runtime::{
    ContainerRuntime, ContainerSpec, ExecOutput, LogOptions, NetworkIo, PortMapping,
    RuntimeResult, StatsSnapshot,
};
