use super::ToolRuntime;
use crate::agent::events::{AgentEvent, EventEmitter};
use crate::domain::types::FunctionCall;
use crate::tooling::{ToolDefinition, ToolInvokeError};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl ToolRuntime {
    /// Run `calls` one after another in declared order and return them with
    /// `result` filled in. Calls that already carry a result are passed through
    /// untouched. A failing tool never aborts the batch: its error is stored as
    /// `{"error": message}` and reported through an `error` event.
    pub(crate) async fn execute_calls(
        &self,
        calls: Vec<FunctionCall>,
        events: &EventEmitter,
    ) -> Vec<FunctionCall> {
        events.emit(AgentEvent::FunctionCallStart {
            function_calls: calls.clone(),
        });

        let mut executed = Vec::with_capacity(calls.len());
        for call in calls {
            if call.is_executed() {
                debug!(tool = %call.name, id = %call.id, "Call already carries a result; skipping");
                executed.push(call);
                continue;
            }

            match self.invoke_bounded(&call).await {
                Ok(output) => {
                    info!(tool = %call.name, id = %call.id, success = true, "Tool executed");
                    executed.push(call.with_result(output));
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(
                        tool = %call.name,
                        id = %call.id,
                        error = %message,
                        "Tool execution failed"
                    );
                    let failed = call.with_result(FunctionCall::error_result(message.as_str()));
                    events.emit(AgentEvent::tool_failure(&failed, &message));
                    executed.push(failed);
                }
            }
        }

        events.emit(AgentEvent::FunctionCallEnd {
            function_calls: executed.clone(),
        });
        executed
    }

    async fn invoke_bounded(&self, call: &FunctionCall) -> Result<Value, ToolInvokeError> {
        let Some(limit) = self.timeout else {
            return self.invoke(call).await;
        };
        match tokio::time::timeout(limit, self.invoke(call)).await {
            Ok(result) => result,
            Err(_) => Err(ToolInvokeError::Timeout {
                name: call.name.clone(),
                after: limit,
            }),
        }
    }

    async fn invoke(&self, call: &FunctionCall) -> Result<Value, ToolInvokeError> {
        if let Some(tool) = self.registry.get(&call.name) {
            debug!(tool = %tool.definition.name, "Dispatching to local tool");
            return tool.handler.call(call.arguments.clone()).await;
        }

        let Some(remote) = &self.remote else {
            return Err(ToolInvokeError::not_found(&call.name));
        };

        debug!(tool = %call.name, "Dispatching to remote tool host");
        match remote
            .invoke(&call.name, Value::Object(call.arguments.clone()))
            .await
        {
            Err(ToolInvokeError::NotFound { .. }) => Err(ToolInvokeError::not_found(&call.name)),
            other => other,
        }
    }

    /// Tools offered to the model for one request: local tools first, then the
    /// remote host's listing, then tools named in the request options. The
    /// first definition of a name wins.
    pub(crate) async fn tool_catalogue(&self, requested: &[ToolDefinition]) -> Vec<ToolDefinition> {
        let mut catalogue = self.registry.definitions();

        if let Some(remote) = &self.remote {
            match remote.list_tools().await {
                Ok(tools) => {
                    debug!(count = tools.len(), "Remote tool host listed tools");
                    catalogue.extend(tools);
                }
                Err(err) => warn!(%err, "Remote tool listing failed; continuing without it"),
            }
        }

        catalogue.extend(requested.iter().cloned());
        let mut seen = HashSet::new();
        catalogue.retain(|tool| seen.insert(tool.name.to_lowercase()));
        catalogue
    }
}
