//! Core types for the agent dispatch service.

use crate::error::ApiError;

/// AgentId: registry key for one agent
pub type AgentId = String;

/// ToolName: key of a tool inside a toolkit
pub type ToolName = String;

/// Longest accepted agent id
pub const MAX_AGENT_ID_LEN: usize = 64;

/// Validate an agent id against the registry charset.
///
/// Ids are non-empty, at most [`MAX_AGENT_ID_LEN`] bytes, and consist of ASCII
/// letters, digits, `-`, `_` and `.`. They must start with a letter or digit so
/// that they are safe as URL path segments and header values.
pub fn validate_agent_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::invalid_id(id, "id cannot be empty"));
    }
    if id.len() > MAX_AGENT_ID_LEN {
        return Err(ApiError::invalid_id(
            id,
            format!("id longer than {} characters", MAX_AGENT_ID_LEN),
        ));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ApiError::invalid_id(
            id,
            format!("character {:?} is not allowed", bad),
        ));
    }
    if !id.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(ApiError::invalid_id(id, "id must start with a letter or digit"));
    }
    Ok(())
}
