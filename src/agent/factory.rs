//! Agent factories: deferred construction of agents from specs.

use super::runtime::{Agent, ReActAgent};
use super::spec::AgentSpec;
use super::validation::validate_agent_spec;
use crate::error::ApiError;
use crate::provider::ModelClientResolver;
use crate::tools::Toolkit;
use std::sync::Arc;
use tracing::debug;

/// Produces a fresh agent instance. Called at most once per successful
/// instantiation; a failed call may be retried by a later lookup.
pub type AgentFactory = Arc<dyn Fn() -> Result<Arc<dyn Agent>, ApiError> + Send + Sync>;

/// Shared services an agent is built from
#[derive(Clone)]
pub struct AgentServices {
    pub models: Arc<dyn ModelClientResolver>,
    pub toolkit: Arc<Toolkit>,
}

impl AgentServices {
    pub fn new(models: Arc<dyn ModelClientResolver>, toolkit: Toolkit) -> Self {
        Self {
            models,
            toolkit: Arc::new(toolkit),
        }
    }
}

/// Factory building a [`ReActAgent`] from `spec`.
///
/// Nothing is resolved until the factory runs: credentials, the model client,
/// and the tool subset are all looked up per construction.
pub fn spec_factory(spec: AgentSpec, services: AgentServices) -> AgentFactory {
    Arc::new(move || build_agent(&spec, &services))
}

pub fn build_agent(spec: &AgentSpec, services: &AgentServices) -> Result<Arc<dyn Agent>, ApiError> {
    let construction = |reason: String| ApiError::Construction {
        agent_id: spec.id.clone(),
        reason,
    };

    validate_agent_spec(spec).map_err(construction)?;

    let model = services
        .models
        .create_chat_model(&spec.model)
        .map_err(|e| construction(e.to_string()))?;

    let toolkit = services.toolkit.select(&spec.tools).map_err(|missing| {
        construction(format!("unknown tool(s): {}", missing.join(", ")))
    })?;

    debug!(
        agent_id = %spec.id,
        model = %model.model_name(),
        tools = toolkit.len(),
        "Built agent"
    );
    Ok(Arc::new(ReActAgent::new(spec.clone(), model, toolkit)))
}
