//! AG-UI wire types: the run request body and the streamed events.

use crate::agent::{AgentEvent, RunInput};
use crate::provider::{ChatMessage, Role, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// `RunAgentInput` body of a run request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<AgUiMessage>,
    #[serde(default)]
    pub forwarded_props: Option<Value>,
}

impl RunAgentInput {
    /// `forwardedProps.agentId`, when it is a string.
    pub fn agent_id_signal(&self) -> Option<String> {
        self.forwarded_props
            .as_ref()
            .and_then(|props| props.get("agentId"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn into_run_input(self) -> RunInput {
        let thread_id = self
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let run_id = self
            .run_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        RunInput {
            thread_id,
            run_id,
            messages: self.messages.into_iter().map(AgUiMessage::into_chat).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgUiMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<AgUiToolCall>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgUiToolCall {
    pub id: String,
    pub function: AgUiFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgUiFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl AgUiMessage {
    fn into_chat(self) -> ChatMessage {
        // "developer" and unknown roles are treated as system instructions
        let role = match self.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::System,
        };
        ChatMessage {
            role,
            content: self.content.unwrap_or_default(),
            tool_calls: self
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
            tool_call_id: self.tool_call_id,
        }
    }
}

/// One server-sent AG-UI event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgUiEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted { thread_id: String, run_id: String },
    #[serde(rename_all = "camelCase")]
    TextMessageStart { message_id: String, role: &'static str },
    #[serde(rename_all = "camelCase")]
    TextMessageContent { message_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    TextMessageEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, delta: String },
    #[serde(rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCallResult {
        message_id: String,
        tool_call_id: String,
        content: String,
        role: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    RunFinished {
        thread_id: String,
        run_id: String,
        result: Value,
    },
    #[serde(rename_all = "camelCase")]
    RunError { message: String, code: String },
}

impl From<AgentEvent> for AgUiEvent {
    fn from(event: AgentEvent) -> Self {
        match event {
            AgentEvent::RunStarted { thread_id, run_id } => AgUiEvent::RunStarted { thread_id, run_id },
            AgentEvent::TextStart { message_id } => AgUiEvent::TextMessageStart {
                message_id,
                role: "assistant",
            },
            AgentEvent::TextDelta { message_id, delta } => {
                AgUiEvent::TextMessageContent { message_id, delta }
            }
            AgentEvent::TextEnd { message_id } => AgUiEvent::TextMessageEnd { message_id },
            AgentEvent::ToolCallStart { tool_call_id, name } => AgUiEvent::ToolCallStart {
                tool_call_id,
                tool_call_name: name,
            },
            AgentEvent::ToolCallArgs {
                tool_call_id,
                arguments,
            } => AgUiEvent::ToolCallArgs {
                tool_call_id,
                delta: arguments,
            },
            AgentEvent::ToolCallEnd { tool_call_id } => AgUiEvent::ToolCallEnd { tool_call_id },
            AgentEvent::ToolResult {
                tool_call_id,
                content,
            } => AgUiEvent::ToolCallResult {
                message_id: Uuid::new_v4().to_string(),
                tool_call_id,
                content,
                role: "tool",
            },
            AgentEvent::RunFinished {
                thread_id,
                run_id,
                reply,
                iterations,
            } => AgUiEvent::RunFinished {
                thread_id,
                run_id,
                result: serde_json::json!({ "reply": reply, "iterations": iterations }),
            },
        }
    }
}
