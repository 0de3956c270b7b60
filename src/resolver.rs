//! Agent resolution
//!
//! Picks the agent id for a request from its routing signals. Precedence,
//! highest first: path segment, header, body field, configured default.
//! Blank signals count as absent. Resolution never consults the registry.

use crate::error::ApiError;
use crate::types::{validate_agent_id, AgentId};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Routing signals carried by one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSignals {
    pub path: Option<String>,
    pub header: Option<String>,
    pub body: Option<String>,
}

impl AgentSignals {
    pub fn path(mut self, value: impl Into<String>) -> Self {
        self.path = Some(value.into());
        self
    }

    pub fn header(mut self, value: impl Into<String>) -> Self {
        self.header = Some(value.into());
        self
    }

    pub fn body(mut self, value: impl Into<String>) -> Self {
        self.body = Some(value.into());
        self
    }
}

/// Which signal decided the resolved id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Path,
    Header,
    Body,
    Default,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalSource::Path => "path",
            SignalSource::Header => "header",
            SignalSource::Body => "body",
            SignalSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Resolves agent ids against a fixed default.
#[derive(Debug, Clone)]
pub struct AgentResolver {
    default_id: AgentId,
}

impl AgentResolver {
    /// Fails when `default_id` is not a well-formed agent id.
    pub fn new(default_id: impl Into<AgentId>) -> Result<Self, ApiError> {
        let default_id = default_id.into().trim().to_string();
        validate_agent_id(&default_id)?;
        Ok(Self { default_id })
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn resolve(&self, signals: &AgentSignals) -> AgentId {
        self.resolve_with_source(signals).0
    }

    pub fn resolve_with_source(&self, signals: &AgentSignals) -> (AgentId, SignalSource) {
        let chain = [
            (signals.path.as_deref(), SignalSource::Path),
            (signals.header.as_deref(), SignalSource::Header),
            (signals.body.as_deref(), SignalSource::Body),
        ];
        let (id, source) = chain
            .into_iter()
            .find_map(|(value, source)| present(value).map(|id| (id.to_string(), source)))
            .unwrap_or_else(|| (self.default_id.clone(), SignalSource::Default));
        debug!(agent_id = %id, source = %source, "Resolved agent");
        (id, source)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
