// Protocol tests - tagged tool-call extraction, removal and JSON repair
// through the public API.

use astrolabe_core::FunctionCall;
use astrolabe_core::agent::{
    format_tagged_calls, has_complete_function_call_tags, parse_function_calls,
    parse_function_calls_value, remove_tagged_function_calls, repair_json, safe_parse,
};
use astrolabe_core::constants::{END_TOOL_CALLS, START_TOOL_CALLS};
use serde_json::{Map, json};

fn call(id: &str, name: &str, city: &str) -> FunctionCall {
    let mut arguments = Map::new();
    arguments.insert("city".into(), json!(city));
    FunctionCall::new(id, name, arguments)
}

#[test]
fn formatted_calls_parse_back_unchanged() {
    let calls = vec![
        call("call_a", "getWeather", "Beijing"),
        call("call_b", "getWeather", "Oslo"),
    ];
    let text = format!("Checking two cities.\n{}", format_tagged_calls(&calls));

    assert_eq!(parse_function_calls(&text), calls);
}

#[test]
fn missing_ids_are_synthesized_and_unique() {
    let text = format!(
        "{START_TOOL_CALLS}{{\"function_calls\": [{{\"name\": \"a\"}}, {{\"name\": \"b\"}}]}}{END_TOOL_CALLS}"
    );
    let calls = parse_function_calls(&text);

    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.id.starts_with("call_")));
    assert_ne!(calls[0].id, calls[1].id);
    assert!(calls.iter().all(|call| call.arguments.is_empty()));
}

#[test]
fn text_without_a_complete_tag_pair_yields_nothing() {
    let inputs = vec![
        "Just an answer.".to_string(),
        format!("{START_TOOL_CALLS}{{\"function_calls\": [{{\"name\": \"a\"}}]}}"),
        format!("{END_TOOL_CALLS} then {START_TOOL_CALLS}"),
        String::new(),
    ];
    for text in &inputs {
        assert!(parse_function_calls(text).is_empty(), "input: {text:?}");
        assert!(!has_complete_function_call_tags(text));
    }
}

#[test]
fn bare_and_fenced_json_are_accepted() {
    let bare = r#"{"function_calls": [{"name": "getWeather", "arguments": {"city": "Rome"}}]}"#;
    assert_eq!(parse_function_calls(bare)[0].arguments["city"], "Rome");

    let fenced = "Here you go:\n```json\n{\"function_calls\": [{\"name\": \"getWeather\", \"arguments\": \"{\\\"city\\\": \\\"Lima\\\"}\"}]}\n```";
    let calls = parse_function_calls(fenced);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].arguments["city"], "Lima");
}

#[test]
fn structured_content_is_searched() {
    let value = json!({
        "message": {
            "function_calls": [{ "id": 7, "name": "getWeather", "arguments": {} }]
        }
    });
    let calls = parse_function_calls_value(&value);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "7");
}

#[test]
fn removal_keeps_prose_and_is_idempotent() {
    let text = format!(
        "Before.\n{}\nAfter.",
        format_tagged_calls(&[call("x", "getWeather", "Paris")])
    );

    let once = remove_tagged_function_calls(&text);
    assert_eq!(once, "Before.\n\nAfter.");
    assert_eq!(remove_tagged_function_calls(&once), once);

    let unpaired = format!("Note: {START_TOOL_CALLS} is the marker.");
    assert_eq!(remove_tagged_function_calls(&unpaired), unpaired);
}

#[test]
fn repair_recovers_common_model_mistakes() {
    assert_eq!(safe_parse(r#"{"a": [1, 2,"#), json!({"a": [1, 2]}));
    assert_eq!(
        safe_parse("```json\n{\"ok\": true}\n```"),
        json!({"ok": true})
    );
    assert_eq!(safe_parse("nothing to see"), json!({}));
    assert_eq!(repair_json(r#"{"name": "getWea"#), Some(json!({"name": "getWea"})));
    assert_eq!(repair_json("   "), None);
}
