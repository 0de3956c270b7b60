//! Agent spec: the immutable description of how to build one agent.

use crate::provider::profile::ModelConfig;
use crate::types::{AgentId, ToolName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conversation memory kept by an agent instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Each run sees only the messages carried by its request
    None,
    /// The instance keeps a transcript across runs for its lifetime
    #[default]
    InMemoryTranscript,
}

/// Agent spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Registry key; taken from the table key when read from config
    #[serde(default)]
    pub id: AgentId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub system_prompt: String,
    pub model: ModelConfig,
    /// Tool names resolved against the service toolkit at construction
    #[serde(default)]
    pub tools: BTreeSet<ToolName>,
    #[serde(default)]
    pub memory: MemoryKind,
    /// Upper bound on reason/act iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    10
}

impl AgentSpec {
    pub fn new(id: impl Into<AgentId>, model: ModelConfig) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            system_prompt: String::new(),
            model,
            tools: BTreeSet::new(),
            memory: MemoryKind::default(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn tool(mut self, name: impl Into<ToolName>) -> Self {
        self.tools.insert(name.into());
        self
    }

    pub fn memory(mut self, memory: MemoryKind) -> Self {
        self.memory = memory;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
