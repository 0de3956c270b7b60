//! Shared doubles for integration tests: scripted chat models and stub agents.
#![allow(dead_code)]

use agentd::agent::{
    Agent, AgentEvent, AgentEventStream, AgentFactory, AgentServices, AgentSpec, RunInput,
};
use agentd::error::ApiError;
use agentd::provider::{
    ChatMessage, ChatModel, ChatRequest, ChatResponse, FinishReason, ModelClientResolver,
    ModelConfig, ProviderType, Role, ToolCall,
};
use agentd::tools::Toolkit;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn text(content: &str) -> ChatResponse {
    ChatResponse {
        message: ChatMessage::assistant(content),
        finish_reason: Some(FinishReason::Stop),
    }
}

pub fn tool_call(name: &str, arguments: &str) -> ChatResponse {
    let mut message = ChatMessage::assistant("");
    message.tool_calls.push(ToolCall {
        id: format!("call_{}", name),
        name: name.to_string(),
        arguments: arguments.to_string(),
    });
    ChatResponse {
        message,
        finish_reason: Some(FinishReason::ToolCalls),
    }
}

/// Replays its script in a loop, recording requests.
pub struct ScriptedModel {
    script: Mutex<VecDeque<ChatResponse>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        self.requests.lock().push(request);
        let mut script = self.script.lock();
        let reply = script
            .pop_front()
            .ok_or_else(|| ApiError::ProviderRequestFailed("empty script".to_string()))?;
        script.push_back(reply.clone());
        Ok(reply)
    }
}

/// Hands every agent a fresh [`ScriptedModel`] with the same script.
#[derive(Clone)]
pub struct ScriptedModels {
    script: Vec<ChatResponse>,
    pub requests: Arc<Mutex<Vec<ChatRequest>>>,
    pub built: Arc<AtomicUsize>,
}

impl ScriptedModels {
    pub fn new(script: Vec<ChatResponse>) -> Self {
        Self {
            script,
            requests: Arc::default(),
            built: Arc::default(),
        }
    }

    pub fn services(&self) -> AgentServices {
        AgentServices::new(Arc::new(self.clone()), Toolkit::with_builtin_tools())
    }

    /// Roles of the messages in the most recent request.
    pub fn last_request_roles(&self) -> Vec<Role> {
        self.requests
            .lock()
            .last()
            .map(|r| r.messages.iter().map(|m| m.role).collect())
            .unwrap_or_default()
    }
}

impl ModelClientResolver for ScriptedModels {
    fn create_chat_model(&self, _config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ApiError> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedModel {
            script: Mutex::new(self.script.clone().into()),
            requests: Arc::clone(&self.requests),
        }))
    }
}

/// Keyless spec so no credential is needed.
pub fn local_spec(id: &str) -> AgentSpec {
    AgentSpec::new(id, ModelConfig::new(ProviderType::Ollama, "scripted"))
}

/// Agent that answers with its id and the last user message.
pub struct StubAgent {
    spec: AgentSpec,
}

impl StubAgent {
    pub fn new(spec: AgentSpec) -> Self {
        Self { spec }
    }
}

impl Agent for StubAgent {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn run_stream(self: Arc<Self>, input: RunInput) -> AgentEventStream {
        let last = input
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let finished = AgentEvent::RunFinished {
            thread_id: input.thread_id,
            run_id: input.run_id,
            reply: format!("{}: {}", self.spec.id, last),
            iterations: 1,
        };
        Box::pin(futures::stream::iter(vec![Ok(finished)]))
    }
}

/// Factory that sleeps for `delay` and counts its invocations.
pub fn slow_factory(id: &str, delay: Duration, calls: Arc<AtomicUsize>) -> AgentFactory {
    let spec = local_spec(id);
    Arc::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(delay);
        Ok(Arc::new(StubAgent { spec: spec.clone() }) as Arc<dyn Agent>)
    })
}

pub fn stub_factory(id: &str) -> AgentFactory {
    slow_factory(id, Duration::ZERO, Arc::default())
}
