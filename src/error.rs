//! Error types shared across the registry, resolver, dispatcher and agent runtime.

use thiserror::Error;

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Agent id is empty or contains characters outside the allowed charset
    #[error("Invalid agent id '{id}': {reason}")]
    InvalidAgentId { id: String, reason: String },

    /// Registration collided with an existing id under the reject policy
    #[error("Agent already registered: {0}")]
    DuplicateAgentId(String),

    /// No registry entry exists for the resolved id
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Factory invocation failed; the entry stays uninstantiated
    #[error("Failed to construct agent '{agent_id}': {reason}")]
    Construction { agent_id: String, reason: String },

    /// Failure inside the agent's reason/act loop
    #[error("Agent '{agent_id}' failed: {reason}")]
    Execution { agent_id: String, reason: String },

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider rate limit: {0}")]
    ProviderRateLimit(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl ApiError {
    pub(crate) fn invalid_id(id: &str, reason: impl Into<String>) -> Self {
        ApiError::InvalidAgentId {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry after fixing the underlying cause
    /// (credential supplied, provider back up). Routing errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Construction { .. }
                | ApiError::MissingCredential(_)
                | ApiError::ProviderRequestFailed(_)
                | ApiError::ProviderRateLimit(_)
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Server(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::ProviderRequestFailed(err.to_string())
    }
}
