use crate::domain::types::FunctionCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context carried unchanged through every recursion level so the original
/// request survives the rewritten follow-up prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

/// Terminal answer of a batch request, or one chunk of a streamed one.
///
/// `content` is a JSON string for text answers and an object or array when the
/// caller asked for JSON and coercion succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: Value,
    pub is_json_response: bool,
    pub is_last: bool,
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
    pub additional_info: AdditionalInfo,
}

/// Streamed chunks share the response shape.
pub type StreamChunk = ChatResponse;

impl ChatResponse {
    pub fn text(
        content: impl Into<String>,
        model: impl Into<String>,
        additional_info: AdditionalInfo,
    ) -> Self {
        Self {
            content: Value::String(content.into()),
            is_json_response: false,
            is_last: false,
            model: model.into(),
            function_calls: Vec::new(),
            additional_info,
        }
    }

    /// Text content, or `None` when the content is structured JSON.
    pub fn as_str(&self) -> Option<&str> {
        self.content.as_str()
    }

    /// Content rendered as text; structured content is serialized.
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
