//! Bundled agent catalog.

use super::factory::AgentServices;
use super::registry::AgentRegistry;
use super::spec::{AgentSpec, MemoryKind};
use crate::error::ApiError;
use crate::provider::profile::{ModelConfig, ProviderType};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

pub const DEFAULT_AGENT_ID: &str = "default";

const ASSISTANT_PROMPT: &str = "You are a helpful AI assistant served over the AG-UI protocol.
You can help users with a range of tasks, including weather lookups and calculations.
Keep your replies concise and helpful.";

const CHAT_PROMPT: &str = "You are a friendly conversational assistant.
Hold a natural conversation and help users with general questions and discussion.";

const CALCULATOR_PROMPT: &str = "You are a math assistant specialized in calculation.
Use the calculation tool to carry out arithmetic.
Always show your working and explain the result.";

fn qwen_plus() -> ModelConfig {
    ModelConfig::new(ProviderType::DashScope, "qwen-plus").streaming(true)
}

/// The three agents shipped with the service, in registration order.
pub fn builtin_specs() -> Vec<AgentSpec> {
    vec![
        AgentSpec::new(DEFAULT_AGENT_ID, qwen_plus().option("enable_thinking", json!(false)))
            .display_name("AG-UI Assistant")
            .system_prompt(ASSISTANT_PROMPT)
            .tool("get_weather")
            .tool("calculate")
            .memory(MemoryKind::InMemoryTranscript)
            .max_iterations(10),
        AgentSpec::new("chat", qwen_plus())
            .display_name("Chat Assistant")
            .system_prompt(CHAT_PROMPT)
            .memory(MemoryKind::InMemoryTranscript)
            .max_iterations(1),
        AgentSpec::new("calculator", qwen_plus())
            .display_name("Calculator Agent")
            .system_prompt(CALCULATOR_PROMPT)
            .tool("get_weather")
            .tool("calculate")
            .memory(MemoryKind::InMemoryTranscript)
            .max_iterations(5),
    ]
}

/// Combine the bundled catalog with configured specs.
///
/// A configured spec replaces the bundled one with the same id in place;
/// new ids follow in key order.
pub fn assemble(include_builtin: bool, configured: &BTreeMap<String, AgentSpec>) -> Vec<AgentSpec> {
    let mut specs = if include_builtin {
        builtin_specs()
    } else {
        Vec::new()
    };
    for (key, spec) in configured {
        let mut spec = spec.clone();
        if spec.id.is_empty() {
            spec.id = key.clone();
        }
        if spec.display_name.trim().is_empty() {
            spec.display_name = spec.id.clone();
        }
        match specs.iter_mut().find(|existing| existing.id == spec.id) {
            Some(existing) => *existing = spec,
            None => specs.push(spec),
        }
    }
    specs
}

/// Register every spec; stops at the first rejected registration.
pub fn register_all(
    registry: &AgentRegistry,
    specs: Vec<AgentSpec>,
    services: &AgentServices,
) -> Result<(), ApiError> {
    for spec in specs {
        registry.register_spec(spec, services.clone())?;
    }
    info!(agents = ?registry.list_ids(), "Agent catalog registered");
    Ok(())
}
