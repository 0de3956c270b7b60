//! Chat message types exchanged with model providers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON argument text as produced by the model
    pub arguments: String,
}

impl ToolCall {
    /// Parse the argument text; empty text is treated as `{}`.
    pub fn parsed_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool input
    pub parameters: Value,
}

/// A single completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    /// Provider-specific options merged into the request body
    pub extra_options: BTreeMap<String, Value>,
}

/// Reason the model stopped producing output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Complete (non-streamed) model reply
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
}

/// Incremental piece of a streamed reply
#[derive(Debug, Clone, PartialEq)]
pub enum ChatChunk {
    /// Text token(s) for the assistant message
    TextDelta(String),
    /// Fragment of a tool call; fragments with the same index belong together
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    Finish(FinishReason),
}

/// Folds streamed chunks back into a complete assistant message.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    content: String,
    calls: BTreeMap<usize, ToolCall>,
    finish_reason: Option<FinishReason>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, chunk: &ChatChunk) {
        match chunk {
            ChatChunk::TextDelta(text) => self.content.push_str(text),
            ChatChunk::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                let call = self.calls.entry(*index).or_insert_with(|| ToolCall {
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                });
                if let Some(id) = id {
                    if !id.is_empty() {
                        call.id = id.clone();
                    }
                }
                if let Some(name) = name {
                    call.name.push_str(name);
                }
                call.arguments.push_str(arguments);
            }
            ChatChunk::Finish(reason) => self.finish_reason = Some(reason.clone()),
        }
    }

    pub fn finish(self) -> ChatResponse {
        let tool_calls = self
            .calls
            .into_iter()
            .map(|(index, mut call)| {
                if call.id.is_empty() {
                    call.id = format!("call_{}", index);
                }
                call
            })
            .collect();
        ChatResponse {
            message: ChatMessage {
                role: Role::Assistant,
                content: self.content,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason: self.finish_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_joins_text_and_tool_fragments() {
        let mut assembler = ResponseAssembler::new();
        assembler.accept(&ChatChunk::TextDelta("Let me ".into()));
        assembler.accept(&ChatChunk::TextDelta("check.".into()));
        assembler.accept(&ChatChunk::ToolCallDelta {
            index: 0,
            id: Some("call_a".into()),
            name: Some("get_weather".into()),
            arguments: "{\"ci".into(),
        });
        assembler.accept(&ChatChunk::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments: "ty\":\"Oslo\"}".into(),
        });
        assembler.accept(&ChatChunk::Finish(FinishReason::ToolCalls));

        let response = assembler.finish();
        assert_eq!(response.message.content, "Let me check.");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.message.tool_calls.len(), 1);
        let call = &response.message.tool_calls[0];
        assert_eq!(call.id, "call_a");
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.parsed_arguments().unwrap()["city"], "Oslo");
    }

    #[test]
    fn assembler_assigns_missing_call_ids() {
        let mut assembler = ResponseAssembler::new();
        assembler.accept(&ChatChunk::ToolCallDelta {
            index: 2,
            id: None,
            name: Some("calculate".into()),
            arguments: String::new(),
        });
        let response = assembler.finish();
        assert_eq!(response.message.tool_calls[0].id, "call_2");
        assert!(response.message.tool_calls[0]
            .parsed_arguments()
            .unwrap()
            .is_object());
    }
}
