//! Request dispatch: resolve the agent id, look up the instance, run it.

use crate::agent::{
    catalog, run_to_completion, Agent, AgentEventStream, AgentRegistry, AgentServices, RunInput,
    RunOutput,
};
use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::resolver::{AgentResolver, AgentSignals, SignalSource};
use crate::types::{validate_agent_id, AgentId};
use std::sync::Arc;
use tracing::{info, warn};

/// One inbound run request
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub signals: AgentSignals,
    pub input: RunInput,
}

/// Completed dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub agent_id: AgentId,
    pub source: SignalSource,
    pub output: RunOutput,
}

/// Routes requests to registry agents.
#[derive(Clone)]
pub struct RequestDispatcher {
    registry: Arc<AgentRegistry>,
    resolver: AgentResolver,
}

impl RequestDispatcher {
    pub fn new(registry: Arc<AgentRegistry>, resolver: AgentResolver) -> Self {
        Self { registry, resolver }
    }

    /// Registry holding the configured catalog, and a resolver on the
    /// configured default id.
    pub fn from_config(config: &ServiceConfig, services: AgentServices) -> Result<Self, ApiError> {
        let registry = Arc::new(AgentRegistry::with_policy(config.registry.overwrite));
        catalog::register_all(&registry, config.agent_specs(), &services)?;
        let resolver = AgentResolver::new(config.default_agent_id.clone())?;
        Ok(Self::new(registry, resolver))
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &AgentResolver {
        &self.resolver
    }

    /// Resolve and look up the agent for `signals`.
    ///
    /// An unknown id is an error; there is no fallback to the default agent.
    pub fn select(&self, signals: &AgentSignals) -> Result<(AgentId, Arc<dyn Agent>), ApiError> {
        self.lookup(signals).map(|(id, _, agent)| (id, agent))
    }

    fn lookup(
        &self,
        signals: &AgentSignals,
    ) -> Result<(AgentId, SignalSource, Arc<dyn Agent>), ApiError> {
        let (id, source) = self.resolver.resolve_with_source(signals);
        validate_agent_id(&id)?;
        match self.registry.get(&id) {
            Ok(agent) => {
                info!(agent_id = %id, source = %source, "Dispatching request");
                Ok((id, source, agent))
            }
            Err(e) => {
                warn!(agent_id = %id, source = %source, error = %e, "Dispatch failed");
                Err(e)
            }
        }
    }

    /// Run the request to completion.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, ApiError> {
        let (agent_id, source, agent) = self.lookup(&request.signals)?;
        let output = run_to_completion(agent, request.input).await?;
        Ok(DispatchOutcome {
            agent_id,
            source,
            output,
        })
    }

    /// Start the request as an event stream. Lookup errors are returned before
    /// any event is produced.
    pub fn dispatch_stream(
        &self,
        request: DispatchRequest,
    ) -> Result<(AgentId, AgentEventStream), ApiError> {
        let (agent_id, agent) = self.select(&request.signals)?;
        Ok((agent_id, agent.run_stream(request.input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentEvent, AgentFactory, AgentSpec};
    use crate::provider::profile::{ModelConfig, ProviderType};
    use futures::StreamExt;

    /// Replies with its own id.
    struct Echo {
        spec: AgentSpec,
    }

    impl Agent for Echo {
        fn id(&self) -> &str {
            &self.spec.id
        }

        fn spec(&self) -> &AgentSpec {
            &self.spec
        }

        fn run_stream(self: Arc<Self>, input: RunInput) -> AgentEventStream {
            let finished = AgentEvent::RunFinished {
                thread_id: input.thread_id,
                run_id: input.run_id,
                reply: format!("hello from {}", self.spec.id),
                iterations: 1,
            };
            Box::pin(futures::stream::iter(vec![Ok(finished)]))
        }
    }

    fn echo_factory(id: &str) -> AgentFactory {
        let spec = AgentSpec::new(id, ModelConfig::new(ProviderType::Ollama, "echo"));
        Arc::new(move || Ok(Arc::new(Echo { spec: spec.clone() }) as Arc<dyn Agent>))
    }

    fn dispatcher() -> RequestDispatcher {
        let registry = Arc::new(AgentRegistry::new());
        for id in ["default", "chat", "calculator"] {
            registry.register_factory(id, echo_factory(id)).unwrap();
        }
        RequestDispatcher::new(registry, AgentResolver::new("default").unwrap())
    }

    #[test]
    fn from_config_registers_catalog_lazily() {
        let services = AgentServices::new(
            Arc::new(crate::provider::EnvModelClientResolver::new()),
            crate::tools::Toolkit::with_builtin_tools(),
        );
        let dispatcher = RequestDispatcher::from_config(&ServiceConfig::default(), services).unwrap();
        assert_eq!(
            dispatcher.registry().list_ids(),
            vec!["default", "chat", "calculator"]
        );
        assert_eq!(
            dispatcher.registry().state("chat"),
            crate::agent::EntryState::Uninstantiated
        );
        assert_eq!(dispatcher.resolver().default_id(), "default");
    }

    #[tokio::test]
    async fn dispatches_to_resolved_agent() {
        let outcome = dispatcher()
            .dispatch(DispatchRequest {
                signals: AgentSignals::default().header("calculator"),
                input: RunInput::user("2+2"),
            })
            .await
            .unwrap();
        assert_eq!(outcome.agent_id, "calculator");
        assert_eq!(outcome.source, SignalSource::Header);
        assert_eq!(outcome.output.reply, "hello from calculator");
    }

    #[tokio::test]
    async fn unknown_agent_has_no_fallback() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(DispatchRequest {
                signals: AgentSignals::default().path("ghost"),
                input: RunInput::user("hi"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownAgent(ref id) if id == "ghost"));
        assert_eq!(dispatcher.registry().len(), 3);

        let err = dispatcher
            .select(&AgentSignals::default().header("no such/agent"))
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::InvalidAgentId { .. }));
    }

    #[tokio::test]
    async fn stream_errors_before_first_event() {
        let dispatcher = dispatcher();
        assert!(dispatcher
            .dispatch_stream(DispatchRequest {
                signals: AgentSignals::default().body("ghost"),
                input: RunInput::user("hi"),
            })
            .is_err());

        let (id, mut events) = dispatcher
            .dispatch_stream(DispatchRequest {
                signals: AgentSignals::default(),
                input: RunInput::user("hi"),
            })
            .unwrap();
        assert_eq!(id, "default");
        assert!(matches!(
            events.next().await,
            Some(Ok(AgentEvent::RunFinished { .. }))
        ));
    }
}
