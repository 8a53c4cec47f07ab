//! Model types - options, responses, chunks and errors

use crate::domain::types::{ChatMessage, FunctionCall};
use crate::tooling::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Request options. Keys the core does not recognise are kept in `extra` and
/// handed to the base model untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Tool schema in the backend's own format, set when the backend calls
    /// tools natively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_tools: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Model name used for capability lookups; empty when unset.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or_default()
    }

    pub fn wants_json(&self) -> bool {
        self.response_format == ResponseFormat::Json
    }
}

/// Complete answer of a non-streamed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
    /// Calls reported through the backend's native tool-calling channel.
    pub tool_calls: Vec<FunctionCall>,
}

impl ModelResponse {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<FunctionCall>) -> Self {
        self.tool_calls = calls;
        self
    }
}

/// One fragment of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChunk {
    pub content: String,
    pub is_last: bool,
}

impl ModelChunk {
    pub fn new(content: impl Into<String>, is_last: bool) -> Self {
        Self {
            content: content.into(),
            is_last,
        }
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("base model '{model}' request failed: {reason}")]
    Backend { model: String, reason: String },
    #[error("base model '{model}' stream failed: {reason}")]
    Stream { model: String, reason: String },
    #[error("base model '{model}' returned invalid response: {reason}")]
    InvalidResponse { model: String, reason: String },
}

impl ModelError {
    pub fn backend(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn stream(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stream {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ModelError::Backend { model, .. } => {
                format!("The model '{model}' could not be reached. Try again later.")
            }
            ModelError::Stream { model, .. } => {
                format!("The answer from '{model}' was interrupted. Try again.")
            }
            ModelError::InvalidResponse { model, .. } => {
                format!("The model '{model}' returned a response that could not be processed.")
            }
        }
    }
}
