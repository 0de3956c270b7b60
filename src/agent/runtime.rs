//! Agent runtime: the [`Agent`] trait and the bounded reason/act loop.

use super::memory::Memory;
use super::spec::AgentSpec;
use crate::error::ApiError;
use crate::provider::{
    response_chunks, ChatChunk, ChatMessage, ChatModel, ChatRequest, ChatStream, ResponseAssembler,
    Role, ToolCall,
};
use crate::tools::Toolkit;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events produced while an agent handles one run
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent, ApiError>>;

/// Input of one agent run
#[derive(Debug, Clone)]
pub struct RunInput {
    pub thread_id: String,
    pub run_id: String,
    pub messages: Vec<ChatMessage>,
}

impl RunInput {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            thread_id: Uuid::new_v4().to_string(),
            run_id: Uuid::new_v4().to_string(),
            messages,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(text)])
    }
}

/// Progress of a run, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    RunStarted {
        thread_id: String,
        run_id: String,
    },
    TextStart {
        message_id: String,
    },
    TextDelta {
        message_id: String,
        delta: String,
    },
    TextEnd {
        message_id: String,
    },
    ToolCallStart {
        tool_call_id: String,
        name: String,
    },
    ToolCallArgs {
        tool_call_id: String,
        arguments: String,
    },
    ToolCallEnd {
        tool_call_id: String,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
    },
    RunFinished {
        thread_id: String,
        run_id: String,
        reply: String,
        iterations: u32,
    },
}

/// Result of a run driven to completion
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub thread_id: String,
    pub run_id: String,
    pub reply: String,
    pub iterations: u32,
    pub tool_calls: usize,
}

/// A stateful conversational agent.
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn spec(&self) -> &AgentSpec;

    /// Handle one run. Dropping the stream cancels the run without affecting
    /// the instance.
    fn run_stream(self: Arc<Self>, input: RunInput) -> AgentEventStream;
}

/// Drive `agent` through one run and collect the final reply.
pub async fn run_to_completion(
    agent: Arc<dyn Agent>,
    input: RunInput,
) -> Result<RunOutput, ApiError> {
    let agent_id = agent.id().to_string();
    let mut events = agent.run_stream(input);
    let mut tool_calls = 0;
    while let Some(event) = events.next().await {
        match event? {
            AgentEvent::ToolCallStart { .. } => tool_calls += 1,
            AgentEvent::RunFinished {
                thread_id,
                run_id,
                reply,
                iterations,
            } => {
                return Ok(RunOutput {
                    thread_id,
                    run_id,
                    reply,
                    iterations,
                    tool_calls,
                })
            }
            _ => {}
        }
    }
    Err(ApiError::Execution {
        agent_id,
        reason: "run ended without a final answer".to_string(),
    })
}

/// Reason/act agent over a chat model and a toolkit.
///
/// Each iteration asks the model for a reply; tool calls are executed and fed
/// back until the model answers without calling tools. When
/// `max_iterations` is spent, one more call is made with tool use disabled so
/// the run still ends with an answer.
pub struct ReActAgent {
    spec: AgentSpec,
    model: Arc<dyn ChatModel>,
    toolkit: Toolkit,
    memory: Memory,
}

impl ReActAgent {
    pub fn new(spec: AgentSpec, model: Arc<dyn ChatModel>, toolkit: Toolkit) -> Self {
        let memory = Memory::for_kind(spec.memory);
        Self {
            spec,
            model,
            toolkit,
            memory,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    fn execution_error(&self, err: ApiError) -> ApiError {
        match err {
            ApiError::Execution { .. } => err,
            other => ApiError::Execution {
                agent_id: self.spec.id.clone(),
                reason: other.to_string(),
            },
        }
    }

    /// Messages this run contributes to the conversation.
    ///
    /// With a transcript the instance already holds the history, so only the
    /// trailing user messages of the request are new. Without one the request
    /// carries the whole conversation.
    fn turn_input(&self, input: &RunInput) -> Result<Vec<ChatMessage>, ApiError> {
        let messages: Vec<ChatMessage> = match self.memory {
            Memory::Transcript(_) => {
                let start = input
                    .messages
                    .iter()
                    .rposition(|m| m.role != Role::User)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                input.messages[start..].to_vec()
            }
            Memory::None => input
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned()
                .collect(),
        };
        if !messages.iter().any(|m| m.role == Role::User) {
            return Err(ApiError::Execution {
                agent_id: self.spec.id.clone(),
                reason: "request carries no user message".to_string(),
            });
        }
        Ok(messages)
    }

    fn request(&self, history: &[ChatMessage], turn: &[ChatMessage], allow_tools: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + turn.len() + 1);
        if !self.spec.system_prompt.trim().is_empty() {
            messages.push(ChatMessage::system(self.spec.system_prompt.trim()));
        }
        messages.extend_from_slice(history);
        messages.extend_from_slice(turn);

        let tools = self.toolkit.definitions();
        let mut extra_options = self.spec.model.extra_options.clone();
        if !allow_tools && !tools.is_empty() {
            extra_options.insert("tool_choice".to_string(), json!("none"));
        }
        ChatRequest {
            model: self.spec.model.model_name.clone(),
            messages,
            tools,
            extra_options,
        }
    }

    async fn call_model(&self, request: ChatRequest) -> Result<ChatStream, ApiError> {
        if self.spec.model.streaming {
            self.model.stream(request).await
        } else {
            let response = self.model.complete(request).await?;
            Ok(response_chunks(response))
        }
    }

    async fn invoke_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.toolkit.get(&call.name) else {
            warn!(agent_id = %self.spec.id, tool = %call.name, "Model requested unavailable tool");
            return format!("Error: tool '{}' is not available", call.name);
        };
        let input = match call.parsed_arguments() {
            Ok(input) => input,
            Err(e) => return format!("Error: invalid arguments for '{}': {}", call.name, e),
        };
        match tool.call(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(agent_id = %self.spec.id, tool = %call.name, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        }
    }

    fn react_loop(
        self: Arc<Self>,
        input: RunInput,
    ) -> impl Stream<Item = Result<AgentEvent, ApiError>> + Send + 'static {
        async_stream::try_stream! {
            let history = self.memory.snapshot();
            let mut turn = self.turn_input(&input)?;
            info!(
                agent_id = %self.spec.id,
                run_id = %input.run_id,
                history = history.len(),
                "Run started"
            );
            yield AgentEvent::RunStarted {
                thread_id: input.thread_id.clone(),
                run_id: input.run_id.clone(),
            };

            let max = self.spec.max_iterations.max(1);
            let mut iterations = 0;
            let reply = loop {
                iterations += 1;
                let allow_tools = iterations <= max;
                debug!(agent_id = %self.spec.id, iteration = iterations, allow_tools, "Calling model");

                let request = self.request(&history, &turn, allow_tools);
                let mut chunks = self
                    .call_model(request)
                    .await
                    .map_err(|e| self.execution_error(e))?;

                let message_id = Uuid::new_v4().to_string();
                let mut assembler = ResponseAssembler::new();
                let mut text_started = false;
                while let Some(chunk) = chunks.next().await {
                    let chunk = chunk.map_err(|e| self.execution_error(e))?;
                    assembler.accept(&chunk);
                    if let ChatChunk::TextDelta(delta) = chunk {
                        if !text_started {
                            text_started = true;
                            yield AgentEvent::TextStart { message_id: message_id.clone() };
                        }
                        yield AgentEvent::TextDelta { message_id: message_id.clone(), delta };
                    }
                }
                if text_started {
                    yield AgentEvent::TextEnd { message_id: message_id.clone() };
                }

                let mut message = assembler.finish().message;
                if message.tool_calls.is_empty() || !allow_tools {
                    message.tool_calls.clear();
                    let reply = message.content.clone();
                    turn.push(message);
                    break reply;
                }

                let calls = message.tool_calls.clone();
                turn.push(message);
                for call in calls {
                    yield AgentEvent::ToolCallStart {
                        tool_call_id: call.id.clone(),
                        name: call.name.clone(),
                    };
                    yield AgentEvent::ToolCallArgs {
                        tool_call_id: call.id.clone(),
                        arguments: call.arguments.clone(),
                    };
                    yield AgentEvent::ToolCallEnd { tool_call_id: call.id.clone() };

                    let output = self.invoke_tool(&call).await;
                    yield AgentEvent::ToolResult {
                        tool_call_id: call.id.clone(),
                        content: output.clone(),
                    };
                    turn.push(ChatMessage::tool_result(call.id, output));
                }
            };

            self.memory.commit(turn);
            info!(agent_id = %self.spec.id, run_id = %input.run_id, iterations, "Run finished");
            yield AgentEvent::RunFinished {
                thread_id: input.thread_id,
                run_id: input.run_id,
                reply,
                iterations,
            };
        }
    }
}

impl Agent for ReActAgent {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    fn run_stream(self: Arc<Self>, input: RunInput) -> AgentEventStream {
        Box::pin(self.react_loop(input))
    }
}
