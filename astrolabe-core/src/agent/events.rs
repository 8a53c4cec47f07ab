//! Lifecycle events reported to the caller while a request runs.

use super::models::ChatResponse;
use crate::domain::types::FunctionCall;
use crate::model::ChatOptions;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum AgentEvent {
    ResponseStart {
        prompt: String,
        options: ChatOptions,
    },
    ResponseChunk {
        chunk: ChatResponse,
    },
    FunctionCallStart {
        function_calls: Vec<FunctionCall>,
    },
    FunctionCallEnd {
        function_calls: Vec<FunctionCall>,
    },
    RecursionStart {
        initial_content: String,
        function_calls: Vec<FunctionCall>,
        depth: usize,
    },
    RecursionEnd {
        final_content: String,
        function_calls: Vec<FunctionCall>,
        depth: usize,
        completed_function_calls: Vec<FunctionCall>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<ChatOptions>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_call: Option<FunctionCall>,
    },
    ResponseEnd {
        response: ChatResponse,
    },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::ResponseStart { .. } => "response_start",
            AgentEvent::ResponseChunk { .. } => "response_chunk",
            AgentEvent::FunctionCallStart { .. } => "function_call_start",
            AgentEvent::FunctionCallEnd { .. } => "function_call_end",
            AgentEvent::RecursionStart { .. } => "recursion_start",
            AgentEvent::RecursionEnd { .. } => "recursion_end",
            AgentEvent::Error { .. } => "error",
            AgentEvent::ResponseEnd { .. } => "response_end",
        }
    }

    /// The event body as JSON, without the type tag.
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("payload").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub(crate) fn tool_failure(call: &FunctionCall, message: &str) -> Self {
        AgentEvent::Error {
            prompt: None,
            options: None,
            error: message.to_string(),
            function_call: Some(call.clone()),
        }
    }

    pub(crate) fn request_failure(prompt: &str, options: &ChatOptions, message: String) -> Self {
        AgentEvent::Error {
            prompt: Some(prompt.to_string()),
            options: Some(options.clone()),
            error: message,
            function_call: None,
        }
    }
}

/// Receiver of [`AgentEvent`]s. Implemented for plain closures.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &AgentEvent);
}

impl<F> EventSink for F
where
    F: Fn(&AgentEvent) + Send + Sync,
{
    fn on_event(&self, event: &AgentEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _event: &AgentEvent) {}
}

#[derive(Clone)]
pub(crate) struct EventEmitter {
    sink: Arc<dyn EventSink>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl EventEmitter {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn emit(&self, event: AgentEvent) {
        trace!(event = event.event_type(), "Emitting agent event");
        self.sink.on_event(&event);
    }
}
