//! Tools
//!
//! Callable tools an agent may offer to its model. A [`Toolkit`] is the set of
//! tools available to the service; each agent gets the subset its spec names.

pub mod builtin;

use crate::error::ApiError;
use crate::provider::ToolDefinition;
use crate::types::ToolName;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A callable tool with a name, an input schema, and a handler.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the input object
    fn input_schema(&self) -> Value;
    async fn call(&self, input: Value) -> Result<String, ApiError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}

/// Named collection of tools
#[derive(Clone, Default)]
pub struct Toolkit {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl Toolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toolkit holding the demo tools shipped with the service.
    pub fn with_builtin_tools() -> Self {
        let mut toolkit = Self::new();
        toolkit.register(Arc::new(builtin::GetWeather));
        toolkit.register(Arc::new(builtin::Calculate));
        toolkit
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().to_string(), tool)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Subset containing exactly `names`; fails listing any name not present.
    pub fn select(&self, names: &BTreeSet<ToolName>) -> Result<Toolkit, Vec<ToolName>> {
        let missing: Vec<ToolName> = names
            .iter()
            .filter(|name| !self.tools.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }
        let tools = names
            .iter()
            .filter_map(|name| self.tools.get(name).map(|tool| (name.clone(), Arc::clone(tool))))
            .collect();
        Ok(Toolkit { tools })
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit").field("tools", &self.names()).finish()
    }
}
