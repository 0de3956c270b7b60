//! Configuration
//!
//! Service settings layered from built-in defaults, the global config file,
//! an explicit `--config` file, and `AGENTD_*` environment variables.

mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;

use crate::agent::{catalog, validate_agent_spec, AgentSpec, OverwritePolicy, DEFAULT_AGENT_ID};
use crate::error::ApiError;
use crate::logging::{validate_logging_config, LoggingConfig};
use crate::types::validate_agent_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Agent used when a request carries no routing signal
    #[serde(default = "default_agent_id")]
    pub default_agent_id: String,

    /// Register the bundled `default`, `chat`, and `calculator` agents
    #[serde(default = "default_true")]
    pub include_builtin_agents: bool,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agent specs keyed by id; override or extend the bundled catalog
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix of the run and agent-listing routes
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Header carrying the agent id signal
    #[serde(default = "default_agent_header")]
    pub agent_header: String,
}

fn default_agent_id() -> String {
    DEFAULT_AGENT_ID.to_string()
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_path() -> String {
    "/agui".to_string()
}

fn default_agent_header() -> String {
    "X-Agent-Id".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            agent_header: default_agent_header(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_agent_id: default_agent_id(),
            include_builtin_agents: true,
            registry: RegistryConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            agents: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Bundled catalog merged with the configured specs.
    pub fn agent_specs(&self) -> Vec<AgentSpec> {
        catalog::assemble(self.include_builtin_agents, &self.agents)
    }

    /// Base path normalized to `/segment` form, or empty for the root.
    pub fn base_path(&self) -> String {
        let trimmed = self.server.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Check the loaded configuration before anything is started.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_agent_id(self.default_agent_id.trim()).map_err(|e| {
            ApiError::ConfigError(format!("default_agent_id is invalid: {}", e))
        })?;

        let specs = self.agent_specs();
        for spec in &specs {
            validate_agent_spec(spec).map_err(ApiError::ConfigError)?;
        }
        for (key, spec) in &self.agents {
            if !spec.id.is_empty() && spec.id != *key {
                return Err(ApiError::ConfigError(format!(
                    "Agent table key '{}' does not match its id '{}'",
                    key, spec.id
                )));
            }
        }
        if !specs.iter().any(|s| s.id == self.default_agent_id.trim()) {
            warn!(
                default_agent_id = %self.default_agent_id,
                "Default agent is not in the catalog; requests without a signal will fail"
            );
        }

        if self.server.agent_header.trim().is_empty() {
            return Err(ApiError::ConfigError("server.agent_header cannot be empty".to_string()));
        }
        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| ApiError::ConfigError(format!("server.bind '{}': {}", self.server.bind, e)))?;

        validate_logging_config(&self.logging)
    }
}
