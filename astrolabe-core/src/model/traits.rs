//! Model traits

use super::types::{ChatOptions, ModelChunk, ModelError, ModelResponse};
use crate::tooling::ToolDefinition;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Value, json};

/// Lazy, finite, non-restartable sequence of chunks from one streamed call.
pub type ChunkStream = BoxStream<'static, Result<ModelChunk, ModelError>>;

/// Text-generation backend wrapped by the orchestrator.
///
/// Capabilities are reported per model name so a single adapter can front
/// several models with different feature sets.
#[async_trait]
pub trait BaseModel: Send + Sync {
    /// Send one prompt and wait for the complete answer.
    async fn unified_chat(
        &self,
        prompt: &str,
        options: &ChatOptions,
    ) -> Result<ModelResponse, ModelError>;

    /// Send one prompt and receive the answer incrementally.
    async fn unified_chat_stream(
        &self,
        prompt: &str,
        options: &ChatOptions,
    ) -> Result<ChunkStream, ModelError>;

    /// Whether `model` accepts structured tool definitions.
    fn supports_tools(&self, model: &str) -> bool;

    /// Whether `model` accepts a separate system message.
    fn supports_system_messages(&self, model: &str) -> bool;

    /// Backend-specific tool schema. Defaults to the OpenAI function layout.
    fn convert_tools_format(&self, tools: &[ToolDefinition]) -> Value {
        Value::Array(
            tools
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
                .collect(),
        )
    }
}
