//! YAML settings file.
//!
//! ```yaml
//! lifecycle:
//!   network_name: ci-testbed
//!   db_ready_timeout_ms: 60000
//!   images:
//!     postgres: postgres:16
//! generation:
//!   rows: 50
//!   null_probability: 0.05
//! ```
//!
//! Every key is optional. Without `--config`, the file at
//! `<config dir>/sql-testbed/config.yaml` is used when it exists.

use crate::container::LifecycleConfig;
use crate::error::{Error, Result};
use crate::synth::{Synthesizer, DEFAULT_NULL_PROBABILITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Test data generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Rows per table
    pub rows: usize,
    /// Probability of NULL for nullable columns
    pub null_probability: f64,
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            null_probability: DEFAULT_NULL_PROBABILITY,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Synthesizer using these settings; `seed` overrides the configured seed
    pub fn synthesizer(&self, seed: Option<u64>) -> Synthesizer {
        let synth = match seed.or(self.seed) {
            Some(seed) => Synthesizer::new(seed),
            None => Synthesizer::from_entropy(),
        };
        synth.with_null_probability(self.null_probability)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lifecycle: LifecycleConfig,
    pub generation: GenerationConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else the default file if present, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => {
                debug!(path = %path.display(), "using default config file");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let p = self.generation.null_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::Config(format!(
                "generation.null_probability must be between 0 and 1, got {}",
                p
            )));
        }
        let lc = &self.lifecycle;
        if lc.db_poll_interval_ms == 0 || lc.app_poll_interval_ms == 0 {
            return Err(Error::Config("poll intervals must be positive".to_string()));
        }
        if lc.network_name.trim().is_empty() {
            return Err(Error::Config("lifecycle.network_name is empty".to_string()));
        }
        Ok(())
    }
}

/// `<config dir>/sql-testbed/config.yaml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sql-testbed").join("config.yaml"))
}
