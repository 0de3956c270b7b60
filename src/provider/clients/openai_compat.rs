//! Client for OpenAI-compatible `chat/completions` endpoints.
//!
//! DashScope's compatible mode, OpenAI and Ollama all accept the same request
//! shape, so one client covers every [`ProviderType`](crate::provider::ProviderType).

use crate::error::ApiError;
use crate::provider::message::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, FinishReason, Role, ToolCall,
};
use crate::provider::{ChatModel, ChatStream};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = Map::new();
        for (key, value) in &request.extra_options {
            body.insert(key.clone(), value.clone());
        }
        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };
        body.insert("model".to_string(), json!(model));
        body.insert(
            "messages".to_string(),
            Value::Array(request.messages.iter().map(encode_message).collect()),
        );
        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".to_string(), Value::Array(tools));
        }
        body.insert("stream".to_string(), json!(stream));
        Value::Object(body)
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .http
            .post(self.completions_url())
            .timeout(REQUEST_TIMEOUT)
            .json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            return Err(ApiError::ProviderRateLimit(format!(
                "{} returned 429: {}",
                self.endpoint, text
            )));
        }
        Err(ApiError::ProviderRequestFailed(format!(
            "{} returned {}: {}",
            self.endpoint, status, text
        )))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        let body = self.request_body(&request, false);
        debug!(model = %self.model, messages = request.messages.len(), "Sending completion request");
        let response = self.send(&body).await?;
        let value: Value = response.json().await?;
        parse_completion(&value)
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, ApiError> {
        let body = self.request_body(&request, true);
        debug!(model = %self.model, messages = request.messages.len(), "Sending streaming request");
        let response = self.send(&body).await?;
        Ok(Box::pin(sse_chunks(response.bytes_stream())))
    }
}

/// Decode an SSE byte stream of `chat.completion.chunk` payloads.
fn sse_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatChunk, ApiError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut decoder = SseDecoder::default();
        while let Some(piece) = bytes.next().await {
            let piece = piece.map_err(|e| ApiError::ProviderRequestFailed(e.to_string()))?;
            for data in decoder.push(piece.as_ref()) {
                if data == "[DONE]" {
                    return;
                }
                for chunk in parse_stream_chunk(&data)? {
                    yield chunk;
                }
            }
        }
    }
}

fn encode_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut value = json!({ "role": role, "content": message.content });
    if !message.tool_calls.is_empty() {
        value["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments },
                    })
                })
                .collect(),
        );
    }
    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }
    value
}

fn first_choice(value: &Value) -> Result<&Value, ApiError> {
    value
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ApiError::ProviderRequestFailed(format!("response has no choices: {}", value)))
}

fn parse_completion(value: &Value) -> Result<ChatResponse, ApiError> {
    let choice = first_choice(value)?;
    let message = choice.get("message").cloned().unwrap_or(Value::Null);
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(index, call)| ToolCall {
                    id: call
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{}", index)),
                    name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                    arguments: call["function"]["arguments"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(FinishReason::from_wire);

    Ok(ChatResponse {
        message: ChatMessage {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        },
        finish_reason,
    })
}

fn parse_stream_chunk(data: &str) -> Result<Vec<ChatChunk>, ApiError> {
    let value: Value = serde_json::from_str(data).map_err(|e| {
        ApiError::ProviderRequestFailed(format!("invalid stream chunk: {} ({})", e, data))
    })?;
    // Usage-only trailer chunks carry an empty choices array.
    let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
        return Ok(Vec::new());
    };

    let mut chunks = Vec::new();
    let delta = &choice["delta"];
    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            chunks.push(ChatChunk::TextDelta(text.to_string()));
        }
    }
    if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
        for (position, call) in calls.iter().enumerate() {
            chunks.push(ChatChunk::ToolCallDelta {
                index: call
                    .get("index")
                    .and_then(Value::as_u64)
                    .map(|i| i as usize)
                    .unwrap_or(position),
                id: call.get("id").and_then(Value::as_str).map(str::to_string),
                name: call["function"]["name"].as_str().map(str::to_string),
                arguments: call["function"]["arguments"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }
    if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
        chunks.push(ChatChunk::Finish(FinishReason::from_wire(reason)));
    }
    Ok(chunks)
}

/// Splits a server-sent-events byte stream into `data:` payloads.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    out.push(data.to_string());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::message::{ResponseAssembler, ToolDefinition};
    use std::collections::BTreeMap;

    #[test]
    fn decoder_handles_split_lines_and_comments() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\ndata: {\"a\"").is_empty());
        let out = decoder.push(b":1}\r\n\ndata: [DONE]\n");
        assert_eq!(out, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
    }

    #[test]
    fn stream_chunks_assemble_into_tool_call() {
        let lines = [
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_x","type":"function","function":{"name":"calculate","arguments":""}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"expression\":"}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"1+2\"}"}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
            r#"{"choices":[],"usage":{"total_tokens":12}}"#,
        ];
        let mut assembler = ResponseAssembler::new();
        for line in lines {
            for chunk in parse_stream_chunk(line).unwrap() {
                assembler.accept(&chunk);
            }
        }
        let response = assembler.finish();
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        let call = &response.message.tool_calls[0];
        assert_eq!(call.id, "call_x");
        assert_eq!(call.name, "calculate");
        assert_eq!(call.parsed_arguments().unwrap()["expression"], "1+2");
    }

    #[tokio::test]
    async fn sse_chunks_stop_at_done() {
        let pieces: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\nda".to_vec()),
            Ok(b"ta: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n".to_vec()),
            Ok(b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n".to_vec()),
        ];
        let chunks: Vec<ChatChunk> = sse_chunks(futures::stream::iter(pieces))
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(
            chunks,
            vec![
                ChatChunk::TextDelta("Hel".into()),
                ChatChunk::TextDelta("lo".into()),
                ChatChunk::Finish(FinishReason::Stop),
            ]
        );
    }

    #[test]
    fn parse_completion_reads_text_and_calls() {
        let value = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let response = parse_completion(&value).unwrap();
        assert_eq!(response.message.content, "");
        assert_eq!(response.message.tool_calls[0].name, "get_weather");
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));

        assert!(parse_completion(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn request_body_merges_extra_options() {
        let client = OpenAiCompatibleClient::new("http://localhost:11434/v1/", "qwen-plus", None);
        assert_eq!(
            client.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );

        let mut extra_options = BTreeMap::new();
        extra_options.insert("enable_thinking".to_string(), json!(false));
        let request = ChatRequest {
            model: String::new(),
            messages: vec![
                ChatMessage::system("be brief"),
                ChatMessage::tool_result("call_1", "42"),
            ],
            tools: vec![ToolDefinition {
                name: "calculate".into(),
                description: "math".into(),
                parameters: json!({"type": "object"}),
            }],
            extra_options,
        };
        let body = client.request_body(&request, true);
        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["stream"], true);
        assert_eq!(body["enable_thinking"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["tool_call_id"], "call_1");
        assert_eq!(body["tools"][0]["function"]["name"], "calculate");
    }
}
