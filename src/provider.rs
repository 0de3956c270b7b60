//! Model Provider Boundary
//!
//! The chat-completion service agents talk to. Agents only see the
//! [`ChatModel`] trait; concrete clients are built from a [`ModelConfig`] by a
//! [`ModelClientResolver`], which is where credentials are looked up.

pub mod clients;
pub mod credentials;
pub mod message;
pub mod profile;

pub use clients::{EnvModelClientResolver, OpenAiCompatibleClient};
pub use message::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, FinishReason, ResponseAssembler, Role,
    ToolCall, ToolDefinition,
};
pub use profile::{ModelConfig, ProviderType};

use crate::error::ApiError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Stream of incremental reply chunks
pub type ChatStream = BoxStream<'static, Result<ChatChunk, ApiError>>;

/// A chat-completion service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Request a complete reply.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ApiError>;

    /// Request a reply as a stream of chunks.
    ///
    /// The default implementation wraps [`ChatModel::complete`] into a
    /// single-text-chunk stream, for providers without streaming support.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, ApiError> {
        let response = self.complete(request).await?;
        Ok(response_chunks(response))
    }
}

/// Replay a complete response as a chunk stream.
pub fn response_chunks(response: ChatResponse) -> ChatStream {
    let mut chunks = Vec::new();
    if !response.message.content.is_empty() {
        chunks.push(Ok(ChatChunk::TextDelta(response.message.content)));
    }
    for (index, call) in response.message.tool_calls.into_iter().enumerate() {
        chunks.push(Ok(ChatChunk::ToolCallDelta {
            index,
            id: Some(call.id),
            name: Some(call.name),
            arguments: call.arguments,
        }));
    }
    if let Some(reason) = response.finish_reason {
        chunks.push(Ok(ChatChunk::Finish(reason)));
    }
    Box::pin(futures::stream::iter(chunks))
}

/// Builds chat model clients for agent construction.
pub trait ModelClientResolver: Send + Sync {
    fn create_chat_model(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ApiError>;
}
