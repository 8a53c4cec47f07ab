//! Tagged tool-call protocol.
//!
//! The model is told to wrap tool requests between [`START_TOOL_CALLS`] and
//! [`END_TOOL_CALLS`] around a `{"function_calls": [...]}` body. Models do not
//! always comply, so extraction falls back through three encodings and stops
//! at the first one that yields a call:
//!
//! 1. a tagged span,
//! 2. the whole content as bare JSON,
//! 3. fenced ```` ```json ```` blocks.

use super::repair::{repair_json, safe_parse};
use crate::constants::{END_TOOL_CALLS, FUNCTION_CALLS_KEY, START_TOOL_CALLS};
use crate::domain::types::FunctionCall;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// How deep JSON-encoded argument strings are unwrapped.
const MAX_ARGUMENT_NESTING: u8 = 3;

static CALL_ORDINAL: AtomicU64 = AtomicU64::new(0);

/// Location of one complete tagged span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaggedSpan {
    /// From the first byte of the start marker to the last byte of the end marker.
    pub outer: Range<usize>,
    /// The JSON body between the markers.
    pub body: Range<usize>,
}

/// Identifier for a call that arrived without one: millisecond timestamp plus
/// a process-wide ordinal, so ids never collide within one process.
pub fn generate_call_id() -> String {
    let ordinal = CALL_ORDINAL.fetch_add(1, Ordering::Relaxed);
    format!("call_{}_{}", Utc::now().timestamp_millis(), ordinal)
}

/// Extract requested calls from raw model text.
pub fn parse_function_calls(content: &str) -> Vec<FunctionCall> {
    let tagged = parse_tagged(content);
    if !tagged.is_empty() {
        debug!(count = tagged.len(), "Parsed tool calls from tagged span");
        return tagged;
    }

    if let Ok(document) = serde_json::from_str::<Value>(content.trim()) {
        let bare = calls_from_document(&document);
        if !bare.is_empty() {
            debug!(count = bare.len(), "Parsed tool calls from bare JSON");
            return bare;
        }
    }

    let fenced = parse_fenced(content);
    if !fenced.is_empty() {
        debug!(
            count = fenced.len(),
            "Parsed tool calls from fenced JSON block"
        );
    }
    fenced
}

/// Extract requested calls from an already-structured response. Strings are
/// treated as raw text; objects are searched for `function_calls` and then for
/// a textual `content` field.
pub fn parse_function_calls_value(content: &Value) -> Vec<FunctionCall> {
    match content {
        Value::String(text) => parse_function_calls(text),
        other => {
            let calls = calls_from_document(other);
            if !calls.is_empty() {
                return calls;
            }
            other
                .get("content")
                .and_then(Value::as_str)
                .map(parse_function_calls)
                .unwrap_or_default()
        }
    }
}

/// Whether `text` holds a start marker followed by an end marker.
pub fn has_complete_function_call_tags(text: &str) -> bool {
    find_span(text, 0).is_some()
}

/// Remove every complete tagged span (markers included) and trim the result.
/// Unpaired markers are left alone. Idempotent.
pub fn remove_tagged_function_calls(text: &str) -> String {
    let mut current = strip_spans(text).trim().to_string();
    loop {
        let next = strip_spans(&current).trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Render calls in the wire format the model is asked to produce.
pub fn format_tagged_calls(calls: &[FunctionCall]) -> String {
    let mut document = Map::new();
    document.insert(FUNCTION_CALLS_KEY.to_string(), json!(calls));
    let body = Value::Object(document);
    format!("{START_TOOL_CALLS}\n{body}\n{END_TOOL_CALLS}")
}

pub(crate) fn find_span(text: &str, from: usize) -> Option<TaggedSpan> {
    let start = from + text.get(from..)?.find(START_TOOL_CALLS)?;
    let body_start = start + START_TOOL_CALLS.len();
    let body_end = body_start + text[body_start..].find(END_TOOL_CALLS)?;
    Some(TaggedSpan {
        outer: start..body_end + END_TOOL_CALLS.len(),
        body: body_start..body_end,
    })
}

/// Calls inside one tagged span body.
pub(crate) fn calls_from_span_body(body: &str) -> Vec<FunctionCall> {
    let document = safe_parse(body);
    let calls = calls_from_document(&document);
    if calls.is_empty() {
        warn!(
            body_len = body.len(),
            "Tagged span did not contain usable function calls"
        );
    }
    calls
}

fn strip_spans(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(span) = find_span(text, cursor) {
        out.push_str(&text[cursor..span.outer.start]);
        cursor = span.outer.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn parse_tagged(content: &str) -> Vec<FunctionCall> {
    let mut calls = Vec::new();
    let mut cursor = 0;
    while let Some(span) = find_span(content, cursor) {
        calls.extend(calls_from_span_body(&content[span.body.clone()]));
        cursor = span.outer.end;
    }
    calls
}

fn parse_fenced(content: &str) -> Vec<FunctionCall> {
    for block in fenced_json_blocks(content) {
        let Some(document) = repair_json(block) else {
            continue;
        };
        let calls = calls_from_document(&document);
        if !calls.is_empty() {
            return calls;
        }
    }
    Vec::new()
}

/// Bodies of ```` ```json ```` blocks, matched non-greedily left to right.
fn fenced_json_blocks(content: &str) -> Vec<&str> {
    const OPEN: &str = "```json";
    const CLOSE: &str = "```";

    // ASCII lowercasing keeps byte offsets aligned with `content`.
    let lowered = content.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(open) = lowered[cursor..].find(OPEN) {
        let body_start = cursor + open + OPEN.len();
        let Some(close) = lowered[body_start..].find(CLOSE) else {
            break;
        };
        let body_end = body_start + close;
        blocks.push(&content[body_start..body_end]);
        cursor = body_end + CLOSE.len();
    }
    blocks
}

/// `function_calls` at the top level, else inside one level of nested objects.
fn calls_from_document(document: &Value) -> Vec<FunctionCall> {
    if let Some(calls) = document.get(FUNCTION_CALLS_KEY) {
        return extract_calls(calls);
    }
    if let Some(map) = document.as_object() {
        for nested in map.values() {
            if let Some(calls) = nested.get(FUNCTION_CALLS_KEY) {
                let found = extract_calls(calls);
                if !found.is_empty() {
                    return found;
                }
            }
        }
    }
    Vec::new()
}

fn extract_calls(value: &Value) -> Vec<FunctionCall> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(call_from_entry).collect(),
        Value::Object(_) => call_from_entry(value).into_iter().collect(),
        Value::String(text) => extract_calls(&safe_parse(text)),
        _ => Vec::new(),
    }
}

fn call_from_entry(entry: &Value) -> Option<FunctionCall> {
    // OpenAI-style entries nest the call under "function".
    let source = match entry.get("name") {
        Some(_) => entry,
        None => entry.get("function").unwrap_or(entry),
    };

    let name = source.get("name").and_then(Value::as_str)?.trim();
    if name.is_empty() {
        return None;
    }

    let id = match entry.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => generate_call_id(),
    };

    let result = entry.get("result").filter(|value| !value.is_null()).cloned();

    Some(FunctionCall {
        id,
        name: name.to_string(),
        arguments: normalize_arguments(source.get("arguments"), name, 0),
        result,
    })
}

fn normalize_arguments(value: Option<&Value>, tool: &str, depth: u8) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) if depth < MAX_ARGUMENT_NESTING => match repair_json(text) {
            Some(decoded) => normalize_arguments(Some(&decoded), tool, depth + 1),
            None => {
                warn!(tool, "Arguments string is not JSON; ignoring");
                Map::new()
            }
        },
        Some(other) => {
            warn!(
                tool,
                kind = value_kind(other),
                "Unsupported arguments shape; ignoring"
            );
            Map::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
