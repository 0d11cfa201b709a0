//! Resource usage calculations from raw container stats.

use super::runtime::{NetworkIo, StatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, schemars::JsonSchema)]
pub struct MemoryUsage {
    pub used: u64,
    pub limit: u64,
    pub percent: f64,
}

/// Point-in-time resource usage of a container
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct ContainerMetrics {
    pub cpu_percent: f64,
    pub memory: MemoryUsage,
    /// Traffic per interface
    pub network: BTreeMap<String, NetworkIo>,
}

impl ContainerMetrics {
    pub fn from_stats(stats: &StatsSnapshot) -> Self {
        let used = stats.memory_usage.unwrap_or(0);
        let limit = stats.memory_limit.unwrap_or(0);
        Self {
            cpu_percent: cpu_percent(stats),
            memory: MemoryUsage {
                used,
                limit,
                percent: memory_percent(used, limit),
            },
            network: stats.networks.iter().cloned().collect(),
        }
    }
}

/// `(cpu delta / system delta) * online cpus * 100`; 0 unless both deltas are positive
pub fn cpu_percent(stats: &StatsSnapshot) -> f64 {
    let cpu_delta = stats.cpu_total as f64 - stats.precpu_total as f64;
    let system_delta = match (stats.system_cpu, stats.presystem_cpu) {
        (Some(now), Some(before)) => now as f64 - before as f64,
        (Some(now), None) => now as f64,
        _ => 0.0,
    };
    if cpu_delta <= 0.0 || system_delta <= 0.0 {
        return 0.0;
    }
    let cpus = stats.online_cpus.filter(|&n| n > 0).unwrap_or(1) as f64;
    cpu_delta / system_delta * cpus * 100.0
}

/// `used / limit * 100`; 0 when the limit is unknown
pub fn memory_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64 * 100.0
    }
}
