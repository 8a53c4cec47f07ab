use crate::constants::{END_TOOL_CALLS, FUNCTION_CALLS_KEY, START_TOOL_CALLS};
use crate::domain::types::FunctionCall;
use crate::model::{BaseModel, ChatOptions};
use crate::tooling::ToolDefinition;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Prompt and options rewritten for one backend's capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedRequest {
    pub prompt: String,
    pub options: ChatOptions,
}

/// Fit a request to what the model behind `options.model` supports.
///
/// Capable backends receive the system message and the tool schema as request
/// fields. Otherwise the system message is prefixed to the prompt and the
/// tools are described in the prompt together with the tagged-call protocol.
pub fn adapt_request(
    model: &dyn BaseModel,
    prompt: &str,
    options: &ChatOptions,
    tools: &[ToolDefinition],
) -> AdaptedRequest {
    let model_name = options.model_name();
    let mut adapted = options.clone();
    let mut sections = Vec::new();

    if !model.supports_system_messages(model_name) {
        if let Some(system) = adapted.system_message.take() {
            if !system.trim().is_empty() {
                sections.push(system);
            }
        }
    }
    sections.push(prompt.to_string());

    adapted.native_tools = None;
    if tools.is_empty() {
        adapted.tools.clear();
    } else if model.supports_tools(model_name) {
        debug!(
            model = model_name,
            count = tools.len(),
            "Passing tools natively"
        );
        adapted.native_tools = Some(model.convert_tools_format(tools));
        adapted.tools = tools.to_vec();
    } else {
        debug!(
            model = model_name,
            count = tools.len(),
            "Describing tools in the prompt"
        );
        sections.push(tool_protocol_instructions(tools));
        adapted.tools.clear();
    }

    AdaptedRequest {
        prompt: sections.join("\n\n"),
        options: adapted,
    }
}

/// Prompt text teaching a backend without native tool calling how to request
/// tools.
pub fn tool_protocol_instructions(tools: &[ToolDefinition]) -> String {
    let mut lines = vec!["You can call the following tools:".to_string()];
    for tool in tools {
        let schema = serde_json::to_string(&tool.parameters).unwrap_or_default();
        if tool.description.is_empty() {
            lines.push(format!("- {}. Parameters: {}", tool.name, schema));
        } else {
            lines.push(format!(
                "- {}: {}. Parameters: {}",
                tool.name, tool.description, schema
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "To call tools, reply with a JSON object whose \"{FUNCTION_CALLS_KEY}\" array lists each call by \"name\" and \"arguments\", wrapped in the markers exactly as shown:"
    ));
    lines.push(example_block());
    lines.push(
        "Call tools only when they are needed. When you can answer directly, reply in plain text without the markers."
            .to_string(),
    );
    lines.join("\n")
}

/// Prompt for the next recursion level: the original request, what the model
/// said last (without its tool-call spans) and the outcome of every call.
pub fn build_follow_up_prompt(
    user_prompt: &str,
    previous_response: &str,
    calls: &[FunctionCall],
) -> String {
    let mut sections = vec![user_prompt.to_string()];
    if !previous_response.trim().is_empty() {
        sections.push(format!("Previous response:\n{}", previous_response.trim()));
    }
    let summary = summarize_results(calls);
    sections.push(format!("Function call results:\n{summary}"));
    sections.push(
        "Continue with the task using these results. Call more tools only if they are still needed; otherwise give the final answer."
            .to_string(),
    );
    sections.join("\n\n")
}

/// One `Function / Parameters / Result` entry per call, separated by blank
/// lines.
pub fn summarize_results(calls: &[FunctionCall]) -> String {
    calls
        .iter()
        .map(|call| {
            let parameters = Value::Object(call.arguments.clone());
            let result = call.result.clone().unwrap_or(Value::Null);
            format!(
                "Function: {}\nParameters: {}\nResult: {}",
                call.name, parameters, result
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn example_block() -> String {
    let mut document = Map::new();
    document.insert(
        FUNCTION_CALLS_KEY.to_string(),
        json!([{ "name": "ToolName", "arguments": { "key": "value" } }]),
    );
    let document = Value::Object(document);
    format!("{START_TOOL_CALLS}\n{document}\n{END_TOOL_CALLS}")
}
