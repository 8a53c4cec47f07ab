use super::errors::AgentError;
use super::events::{AgentEvent, EventEmitter, EventSink};
use super::models::{AdditionalInfo, ChatResponse};
use super::recursion::{RecursionTrail, exhausted_content, final_response};
use super::runtime::ToolRuntime;
use super::runtime::instructions::{adapt_request, build_follow_up_prompt};
use super::runtime::parser::{
    has_complete_function_call_tags, parse_function_calls, remove_tagged_function_calls,
};
use super::runtime::repair::repair_json;
use crate::config::AgentConfig;
use crate::model::{BaseModel, ChatOptions, ModelError, ModelResponse};
use crate::tooling::{RemoteToolHost, ToolDefinition, ToolRegistry};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Drives the parse, execute and re-prompt loop for one base model.
///
/// The agent keeps no per-request state; every call to [`Agent::chat`] or
/// [`Agent::chat_stream`] owns its own recursion bookkeeping, so one agent can
/// serve concurrent requests.
pub struct Agent {
    pub(super) model: Arc<dyn BaseModel>,
    pub(super) runtime: ToolRuntime,
    pub(super) events: EventEmitter,
    pub(super) config: AgentConfig,
}

impl Agent {
    pub fn new(model: Arc<dyn BaseModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            runtime: ToolRuntime::new(registry, None),
            events: EventEmitter::default(),
            config: AgentConfig::default(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteToolHost>) -> Self {
        self.runtime = self.runtime.with_remote(remote);
        self
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = EventEmitter::new(sink);
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.runtime = self.runtime.with_timeout(config.tool_timeout());
        self.config = config;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answer `prompt`, running every tool the model asks for until it stops
    /// asking or `max_recursion_depth` follow-up calls have been made.
    pub async fn chat(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<ChatResponse, AgentError> {
        let request_id = Uuid::new_v4();
        self.run_chat(prompt, options)
            .instrument(info_span!("agent_chat", %request_id))
            .await
    }

    async fn run_chat(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<ChatResponse, AgentError> {
        self.validate(prompt, &options)?;
        info!(model = options.model_name(), "Agent chat started");
        self.events.emit(AgentEvent::ResponseStart {
            prompt: prompt.to_string(),
            options: options.clone(),
        });

        let tools = self.runtime.tool_catalogue(&options.tools).await;
        let additional_info = AdditionalInfo {
            user_prompt: prompt.to_string(),
            system_message: options.system_message.clone(),
        };
        let max_depth = self.config.max_recursion_depth;
        let mut trail = RecursionTrail::default();
        let mut next_prompt = prompt.to_string();
        let mut depth = 0;

        loop {
            let response = self.call_model(&next_prompt, &options, &tools).await?;
            let model = response_model(&response, &options);
            let cleaned = remove_tagged_function_calls(&response.content);

            if depth >= max_depth {
                let with_notice = depth > 0
                    || !response.tool_calls.is_empty()
                    || has_complete_function_call_tags(&response.content);
                if with_notice {
                    warn!(depth, max_depth, "Maximum recursion depth reached");
                }
                let text = if options.wants_json() && repair_json(&cleaned).is_some() {
                    cleaned
                } else {
                    exhausted_content(&cleaned, with_notice)
                };
                return Ok(self.finish(text, &options, model, &trail, additional_info));
            }

            let requested = if response.tool_calls.is_empty() {
                parse_function_calls(&response.content)
            } else {
                response.tool_calls
            };
            let calls = trail.fresh(requested);
            if calls.is_empty() {
                debug!(depth, "Model answered without requesting tools");
                return Ok(self.finish(cleaned, &options, model, &trail, additional_info));
            }

            info!(depth, count = calls.len(), "Model requested tool calls");
            let executed = self.runtime.execute_calls(calls, &self.events).await;
            depth += 1;
            self.events.emit(AgentEvent::RecursionStart {
                initial_content: cleaned.clone(),
                function_calls: executed.clone(),
                depth,
            });
            next_prompt = build_follow_up_prompt(prompt, &cleaned, &executed);
            trail.record(depth, &executed);
        }
    }

    pub(super) fn validate(&self, prompt: &str, options: &ChatOptions) -> Result<(), AgentError> {
        if !prompt.trim().is_empty() {
            return Ok(());
        }
        let err = AgentError::InvalidRequest("prompt must not be empty".to_string());
        let event = AgentEvent::request_failure(prompt, options, err.to_string());
        self.events.emit(event);
        Err(err)
    }

    async fn call_model(
        &self,
        prompt: &str,
        options: &ChatOptions,
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, AgentError> {
        let request = adapt_request(self.model.as_ref(), prompt, options, tools);
        self.model
            .unified_chat(&request.prompt, &request.options)
            .await
            .map_err(|err| self.model_failure(&request.prompt, &request.options, err))
    }

    pub(super) fn model_failure(
        &self,
        prompt: &str,
        options: &ChatOptions,
        err: ModelError,
    ) -> AgentError {
        warn!(error = %err, "Base model call failed");
        let event = AgentEvent::request_failure(prompt, options, err.to_string());
        self.events.emit(event);
        AgentError::Model(err)
    }

    fn finish(
        &self,
        text: String,
        options: &ChatOptions,
        model: String,
        trail: &RecursionTrail,
        additional_info: AdditionalInfo,
    ) -> ChatResponse {
        trail.unwind(&text, &self.events);
        let response = final_response(
            text,
            options.wants_json(),
            model,
            trail.completed().to_vec(),
            additional_info,
        );
        info!(
            function_calls = response.function_calls.len(),
            json = response.is_json_response,
            "Agent chat finished"
        );
        self.events.emit(AgentEvent::ResponseEnd {
            response: response.clone(),
        });
        response
    }
}

/// Model name reported by the backend, else the one requested.
pub(super) fn response_model(response: &ModelResponse, options: &ChatOptions) -> String {
    if response.model.is_empty() {
        options.model_name().to_string()
    } else {
        response.model.clone()
    }
}
