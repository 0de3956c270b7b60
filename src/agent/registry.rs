//! Agent registry
//!
//! Maps agent ids to factories and lazily built, cached instances. The table
//! lock covers registration and removal only; construction happens under a
//! per-id build lock, so first lookups of different ids build in parallel and
//! concurrent first lookups of the same id share one instance. The cached
//! instance sits behind its own lock, so state queries never wait on a build.

use super::factory::{spec_factory, AgentFactory, AgentServices};
use super::runtime::Agent;
use super::spec::AgentSpec;
use super::validation::validate_agent_spec;
use crate::error::ApiError;
use crate::types::{validate_agent_id, AgentId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What `register_factory` does when the id is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    #[default]
    Reject,
    /// Swap in the new factory and drop any cached instance
    Replace,
}

/// Lifecycle state of one id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unregistered,
    Uninstantiated,
    Instantiated,
}

struct Entry {
    factory: AgentFactory,
    /// Held by `get` for the duration of one construction
    build: Mutex<()>,
    instance: RwLock<Option<Arc<dyn Agent>>>,
}

impl Entry {
    fn new(factory: AgentFactory) -> Arc<Self> {
        Arc::new(Self {
            factory,
            build: Mutex::new(()),
            instance: RwLock::new(None),
        })
    }

    fn cached(&self) -> Option<Arc<dyn Agent>> {
        self.instance.read().clone()
    }
}

#[derive(Default)]
struct Table {
    entries: HashMap<AgentId, Arc<Entry>>,
    /// Registration order
    order: Vec<AgentId>,
}

/// Directory of agent factories and their cached instances.
pub struct AgentRegistry {
    table: RwLock<Table>,
    policy: OverwritePolicy,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::with_policy(OverwritePolicy::default())
    }

    pub fn with_policy(policy: OverwritePolicy) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            policy,
        }
    }

    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Register `factory` under `id`.
    ///
    /// Under [`OverwritePolicy::Replace`] an existing entry is replaced
    /// wholesale, so its cached instance is never handed out again. A lookup
    /// already building on the old entry completes for its own caller only.
    pub fn register_factory(&self, id: &str, factory: AgentFactory) -> Result<(), ApiError> {
        validate_agent_id(id)?;

        let mut table = self.table.write();
        if table.entries.contains_key(id) {
            match self.policy {
                OverwritePolicy::Reject => {
                    warn!(agent_id = %id, "Rejected duplicate agent registration");
                    return Err(ApiError::DuplicateAgentId(id.to_string()));
                }
                OverwritePolicy::Replace => {
                    table.entries.insert(id.to_string(), Entry::new(factory));
                    info!(agent_id = %id, "Replaced agent factory");
                    return Ok(());
                }
            }
        }

        table.entries.insert(id.to_string(), Entry::new(factory));
        table.order.push(id.to_string());
        info!(agent_id = %id, "Registered agent factory");
        Ok(())
    }

    /// Register a spec-built factory keyed by `spec.id`.
    pub fn register_spec(&self, spec: AgentSpec, services: AgentServices) -> Result<(), ApiError> {
        validate_agent_id(&spec.id)?;
        validate_agent_spec(&spec).map_err(ApiError::ConfigError)?;
        let id = spec.id.clone();
        self.register_factory(&id, spec_factory(spec, services))
    }

    /// Return the instance for `id`, building it on first use.
    ///
    /// A failed build leaves the entry uninstantiated; the next call retries.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Agent>, ApiError> {
        let entry = self.entry(id)?;
        if let Some(agent) = entry.cached() {
            return Ok(agent);
        }

        let _build = entry.build.lock();
        if let Some(agent) = entry.cached() {
            return Ok(agent);
        }

        debug!(agent_id = %id, "Constructing agent");
        let agent = (entry.factory)().map_err(|e| match e {
            ApiError::Construction { .. } => e,
            other => ApiError::Construction {
                agent_id: id.to_string(),
                reason: other.to_string(),
            },
        });
        match agent {
            Ok(agent) => {
                *entry.instance.write() = Some(Arc::clone(&agent));
                info!(agent_id = %id, "Agent instantiated");
                Ok(agent)
            }
            Err(e) => {
                warn!(agent_id = %id, error = %e, "Agent construction failed");
                Err(e)
            }
        }
    }

    fn entry(&self, id: &str) -> Result<Arc<Entry>, ApiError> {
        let table = self.table.read();
        table
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::UnknownAgent(id.to_string()))
    }

    /// All registered ids in registration order.
    pub fn list_ids(&self) -> Vec<AgentId> {
        self.table.read().order.clone()
    }

    /// Evict the factory and any cached instance. Returns whether an entry
    /// existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut table = self.table.write();
        let removed = table.entries.remove(id).is_some();
        if removed {
            table.order.retain(|existing| existing != id);
            info!(agent_id = %id, "Removed agent");
        }
        removed
    }

    /// Drop the cached instance, keeping the factory. Returns whether an
    /// instance was dropped.
    pub fn reset(&self, id: &str) -> bool {
        let Ok(entry) = self.entry(id) else {
            return false;
        };
        let dropped = entry.instance.write().take().is_some();
        if dropped {
            info!(agent_id = %id, "Reset agent instance");
        }
        dropped
    }

    pub fn state(&self, id: &str) -> EntryState {
        match self.entry(id) {
            Err(_) => EntryState::Unregistered,
            Ok(entry) => {
                if entry.instance.read().is_some() {
                    EntryState::Instantiated
                } else {
                    EntryState::Uninstantiated
                }
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.table.read().entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
