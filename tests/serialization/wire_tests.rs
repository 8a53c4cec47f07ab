// Serialization tests - JSON shapes of the public data model.

use astrolabe_core::agent::AdditionalInfo;
use astrolabe_core::types::{ChatMessage, MessageRole};
use astrolabe_core::{
    AgentEvent, ChatOptions, ChatResponse, FunctionCall, ResponseFormat, ToolDefinition,
};
use serde_json::{Map, json};

#[test]
fn chat_options_keep_unknown_keys() {
    let options: ChatOptions = serde_json::from_value(json!({
        "model": "mistral",
        "temperature": 0.2,
        "responseFormat": "json",
        "systemMessage": "Be helpful.",
        "history": [{"role": "user", "content": "earlier"}],
        "seed": 42
    }))
    .expect("deserialize");

    assert_eq!(options.model.as_deref(), Some("mistral"));
    assert_eq!(options.response_format, ResponseFormat::Json);
    assert_eq!(
        options.history,
        vec![ChatMessage::new(MessageRole::User, "earlier")]
    );
    assert_eq!(options.extra["seed"], 42);

    let value = serde_json::to_value(&options).expect("serialize");
    assert_eq!(value["seed"], 42);
    assert_eq!(value["systemMessage"], "Be helpful.");
    assert!(value.get("tools").is_none());
}

#[test]
fn chat_response_uses_camel_case() {
    let response = ChatResponse::text(
        "done",
        "llama3",
        AdditionalInfo {
            user_prompt: "hi".into(),
            system_message: None,
        },
    );
    let value = serde_json::to_value(&response).expect("serialize");

    assert_eq!(
        value,
        json!({
            "content": "done",
            "isJsonResponse": false,
            "isLast": false,
            "model": "llama3",
            "additionalInfo": { "userPrompt": "hi" }
        })
    );
}

#[test]
fn function_call_omits_missing_result() {
    let mut arguments = Map::new();
    arguments.insert("city".into(), json!("Oslo"));
    let pending = FunctionCall::new("call_1", "getWeather", arguments);

    let value = serde_json::to_value(&pending).expect("serialize");
    assert!(value.get("result").is_none());

    let done = pending.with_result(json!({"temp": 3}));
    let value = serde_json::to_value(&done).expect("serialize");
    assert_eq!(value["result"]["temp"], 3);
}

#[test]
fn tool_definition_defaults_to_empty_object_schema() {
    let tool: ToolDefinition =
        serde_json::from_value(json!({"name": "ping"})).expect("deserialize");
    assert_eq!(tool.description, "");
    assert_eq!(tool.parameters, json!({"type": "object", "properties": {}}));
}

#[test]
fn every_event_reports_its_type() {
    let response = ChatResponse::text("x", "m", AdditionalInfo::default());
    let events = vec![
        AgentEvent::ResponseStart {
            prompt: "p".into(),
            options: ChatOptions::new(),
        },
        AgentEvent::ResponseChunk {
            chunk: response.clone(),
        },
        AgentEvent::FunctionCallStart {
            function_calls: Vec::new(),
        },
        AgentEvent::FunctionCallEnd {
            function_calls: Vec::new(),
        },
        AgentEvent::RecursionStart {
            initial_content: String::new(),
            function_calls: Vec::new(),
            depth: 1,
        },
        AgentEvent::RecursionEnd {
            final_content: String::new(),
            function_calls: Vec::new(),
            depth: 1,
            completed_function_calls: Vec::new(),
        },
        AgentEvent::Error {
            prompt: None,
            options: None,
            error: "e".into(),
            function_call: None,
        },
        AgentEvent::ResponseEnd { response },
    ];

    for event in &events {
        let value = serde_json::to_value(event).expect("serialize");
        assert_eq!(value["type"], event.event_type());
        assert_eq!(value["payload"], event.payload());
    }
}
