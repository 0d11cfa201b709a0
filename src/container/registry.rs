//! In-memory registry of provisioned containers.

use super::config::DatabaseKind;
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What a container is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    Database,
    Application,
}

impl fmt::Display for ContainerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerRole::Database => write!(f, "database"),
            ContainerRole::Application => write!(f, "application"),
        }
    }
}

/// Lifecycle position of a provisioned container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Created,
    Starting,
    WaitingReady,
    Ready,
    Failed,
    Stopping,
    Removed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerState::Created => "created",
            ContainerState::Starting => "starting",
            ContainerState::WaitingReady => "waiting_ready",
            ContainerState::Ready => "ready",
            ContainerState::Failed => "failed",
            ContainerState::Stopping => "stopping",
            ContainerState::Removed => "removed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub id: String,
    pub name: String,
    pub role: ContainerRole,
    pub state: ContainerState,
    pub started_at: DateTime<Utc>,
    pub database: Option<DatabaseKind>,
    pub project_path: Option<PathBuf>,
    /// Registration order
    sequence: u64,
}

impl RegistryEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: ContainerRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            state: ContainerState::Created,
            started_at: Utc::now(),
            database: None,
            project_path: None,
            sequence: 0,
        }
    }
}

/// Thread-safe map of container id to entry. The lock is never held across
/// an await point.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<AHashMap<String, RegistryEntry>>,
    next_sequence: Mutex<u64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mut entry: RegistryEntry) {
        let mut next = self.next_sequence.lock();
        entry.sequence = *next;
        *next += 1;
        self.entries.lock().insert(entry.id.clone(), entry);
    }

    /// Update the state of a registered container; false if unknown
    pub fn set_state(&self, id: &str, state: ContainerState) -> bool {
        match self.entries.lock().get_mut(id) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<RegistryEntry> {
        self.entries.lock().get(id).cloned()
    }

    pub fn state(&self, id: &str) -> Option<ContainerState> {
        self.entries.lock().get(id).map(|e| e.state)
    }

    pub fn remove(&self, id: &str) -> Option<RegistryEntry> {
        self.entries.lock().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<String> {
        let entries = self.entries.lock();
        let mut ordered: Vec<&RegistryEntry> = entries.values().collect();
        ordered.sort_by_key(|e| e.sequence);
        ordered.into_iter().map(|e| e.id.clone()).collect()
    }

    /// Name of the most recently registered database container that is ready
    pub fn latest_database_name(&self) -> Option<String> {
        self.entries
            .lock()
            .values()
            .filter(|e| e.role == ContainerRole::Database && e.state == ContainerState::Ready)
            .max_by_key(|e| e.sequence)
            .map(|e| e.name.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
