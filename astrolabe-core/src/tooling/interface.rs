use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::ToolInvokeError;

/// Tool description offered to the model: the shape used by local tools,
/// remote listings and `ChatOptions::tools` alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

fn empty_parameters() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// External service exposing discoverable tools.
#[async_trait]
pub trait RemoteToolHost: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolInvokeError>;

    /// Invoke `name`. Hosts that do not know the tool return
    /// [`ToolInvokeError::NotFound`].
    async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolInvokeError>;
}
