use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    /// The tool ran and reported a failure; the message is surfaced verbatim.
    #[error("{0}")]
    Failed(String),
    #[error("Function '{name}' not found")]
    NotFound { name: String },
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("remote tool host transport error: {message}")]
    Transport { message: String },
    #[error("Function '{name}' timed out after {}s", after.as_secs())]
    Timeout { name: String, after: Duration },
}

impl ToolInvokeError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ToolInvokeError::Failed(message) => format!("The tool reported an error: {message}"),
            ToolInvokeError::NotFound { name } => {
                format!("Tool \"{name}\" is not available.")
            }
            ToolInvokeError::InvalidArguments { tool, .. } => {
                format!("Tool \"{tool}\" was called with arguments it cannot use.")
            }
            ToolInvokeError::Transport { .. } => {
                "The remote tool host could not be reached. Try again later.".to_string()
            }
            ToolInvokeError::Timeout { name, .. } => {
                format!("Tool \"{name}\" took too long to respond.")
            }
        }
    }
}

impl From<serde_json::Error> for ToolInvokeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Failed(value.to_string())
    }
}
