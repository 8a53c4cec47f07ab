// Shared fixtures - a scripted base model, a weather tool and an event recorder.

#![allow(dead_code)]

use astrolabe_core::agent::NoopSink;
use astrolabe_core::constants::{END_TOOL_CALLS, START_TOOL_CALLS};
use astrolabe_core::model::ChunkStream;
use astrolabe_core::telemetry::init_tracing;
use astrolabe_core::{
    Agent, AgentEvent, BaseModel, ChatOptions, EventSink, ModelChunk, ModelError, ModelResponse,
    ToolDefinition, ToolInvokeError, ToolRegistry,
};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Base model answering from a script. Each call consumes one entry; the last
/// entry repeats once the script runs out.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<Mutex<Vec<String>>>,
    streams: Arc<Mutex<Vec<Vec<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
            ..Self::default()
        }
    }

    pub fn streaming(levels: &[&[&str]]) -> Self {
        Self {
            streams: Arc::new(Mutex::new(
                levels
                    .iter()
                    .map(|chunks| chunks.iter().map(|c| c.to_string()).collect())
                    .collect(),
            )),
            ..Self::default()
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

fn next_entry<T: Clone>(script: &mut Vec<T>) -> Option<T> {
    if script.len() > 1 {
        Some(script.remove(0))
    } else {
        script.first().cloned()
    }
}

#[async_trait]
impl BaseModel for ScriptedModel {
    async fn unified_chat(
        &self,
        prompt: &str,
        _options: &ChatOptions,
    ) -> Result<ModelResponse, ModelError> {
        self.prompts.lock().await.push(prompt.to_string());
        let reply = next_entry(&mut *self.replies.lock().await)
            .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted"))?;
        Ok(ModelResponse::new(reply, "scripted"))
    }

    async fn unified_chat_stream(
        &self,
        prompt: &str,
        _options: &ChatOptions,
    ) -> Result<ChunkStream, ModelError> {
        self.prompts.lock().await.push(prompt.to_string());
        let chunks = next_entry(&mut *self.streams.lock().await)
            .ok_or_else(|| ModelError::stream("scripted", "script exhausted"))?;
        let total = chunks.len();
        let items: Vec<Result<ModelChunk, ModelError>> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| Ok(ModelChunk::new(text, index + 1 == total)))
            .collect();
        Ok(Box::pin(tokio_stream::iter(items)))
    }

    fn supports_tools(&self, _model: &str) -> bool {
        false
    }

    fn supports_system_messages(&self, _model: &str) -> bool {
        false
    }
}

#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<std::sync::Mutex<Vec<AgentEvent>>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().expect("event log").clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(AgentEvent::event_type).collect()
    }

    pub fn first(&self, kind: &str) -> Option<AgentEvent> {
        self.events()
            .into_iter()
            .find(|event| event.event_type() == kind)
    }
}

impl EventSink for EventRecorder {
    fn on_event(&self, event: &AgentEvent) {
        self.events.lock().expect("event log").push(event.clone());
    }
}

/// Model text requesting one call through the tagged protocol.
pub fn tagged_call(name: &str, arguments: Value) -> String {
    format!(
        "Let me look that up.\n{START_TOOL_CALLS}\n{{\"function_calls\": [{{\"name\": \"{name}\", \"arguments\": {arguments}}}]}}\n{END_TOOL_CALLS}"
    )
}

pub fn weather_registry() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new().with_fn(
        ToolDefinition::new(
            "getWeather",
            "Current weather for a city",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        ),
        |arguments: Map<String, Value>| async move {
            match arguments.get("city").and_then(Value::as_str) {
                Some(city) => Ok(json!({ "city": city, "forecast": "sunny" })),
                None => Err(ToolInvokeError::failed("city is required")),
            }
        },
    ))
}

pub fn agent_with(model: &ScriptedModel) -> (Agent, EventRecorder) {
    init_tracing();
    let recorder = EventRecorder::default();
    let agent = Agent::new(Arc::new(model.clone()), weather_registry())
        .with_events(Arc::new(recorder.clone()));
    (agent, recorder)
}

pub fn silent_agent(model: &ScriptedModel) -> Agent {
    init_tracing();
    Agent::new(Arc::new(model.clone()), weather_registry()).with_events(Arc::new(NoopSink))
}
