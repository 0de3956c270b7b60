//! Agent spec validation owned by the agent domain.

use super::spec::AgentSpec;
use crate::types::validate_agent_id;

/// Validate agent spec.
pub fn validate_agent_spec(spec: &AgentSpec) -> Result<(), String> {
    validate_agent_id(&spec.id).map_err(|e| e.to_string())?;

    if spec.display_name.trim().is_empty() {
        return Err(format!("Agent '{}' display name cannot be empty", spec.id));
    }

    if spec.max_iterations == 0 {
        return Err(format!(
            "Agent '{}' max_iterations must be greater than zero",
            spec.id
        ));
    }

    if let Some(tool) = spec.tools.iter().find(|t| t.trim().is_empty()) {
        return Err(format!("Agent '{}' has an empty tool name {:?}", spec.id, tool));
    }

    spec.model
        .validate()
        .map_err(|e| format!("Agent '{}' model config: {}", spec.id, e))?;

    Ok(())
}
