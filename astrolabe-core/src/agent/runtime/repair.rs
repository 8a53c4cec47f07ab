//! Best-effort coercion of model-produced JSON.
//!
//! Model output is frequently truncated or decorated with prose, so a strict
//! parse is followed by a structural repair pass. Nothing here returns an
//! error: callers either get a value or learn that none could be recovered.

use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

impl Container {
    fn closer(self) -> char {
        match self {
            Container::Object => '}',
            Container::Array => ']',
        }
    }
}

/// Last significant token emitted by the repair scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Open,
    Comma,
    Colon,
    Key,
    Value,
}

/// Parse `text`, repairing it if needed; an empty object when nothing can be
/// recovered.
pub fn safe_parse(text: &str) -> Value {
    repair_json(text).unwrap_or_else(|| {
        warn!(
            length = text.len(),
            "Unrecoverable JSON; falling back to empty object"
        );
        Value::Object(Map::new())
    })
}

/// Parse `text`, repairing it if needed. `None` when no JSON value can be
/// recovered.
pub fn repair_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find(['{', '['])?;
    let repaired = balance(&unfenced[start..]);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => {
            debug!(
                original = text.len(),
                repaired = repaired.len(),
                "Repaired malformed JSON"
            );
            Some(value)
        }
        Err(err) => {
            debug!(%err, "JSON repair pass did not produce a valid document");
            None
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Close what was left open, drop dangling commas, complete dangling keys and
/// cut anything after the top-level value.
fn balance(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut stack: Vec<Container> = Vec::new();
    let mut last = Token::Value;
    let mut in_string = false;
    let mut string_is_key = false;
    let mut escaped = false;

    for ch in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    last = if string_is_key { Token::Key } else { Token::Value };
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                string_is_key = stack.last() == Some(&Container::Object)
                    && matches!(last, Token::Open | Token::Comma);
                out.push(ch);
            }
            '{' | '[' => {
                stack.push(if ch == '{' {
                    Container::Object
                } else {
                    Container::Array
                });
                last = Token::Open;
                out.push(ch);
            }
            '}' | ']' => {
                let kind = if ch == '}' {
                    Container::Object
                } else {
                    Container::Array
                };
                if !stack.contains(&kind) {
                    continue;
                }
                while let Some(top) = stack.pop() {
                    complete_dangling(&mut out, last);
                    out.push(top.closer());
                    last = Token::Value;
                    if top == kind {
                        break;
                    }
                }
                if stack.is_empty() {
                    return out;
                }
            }
            ',' => {
                if matches!(last, Token::Comma | Token::Open) {
                    continue;
                }
                last = Token::Comma;
                out.push(ch);
            }
            ':' => {
                last = Token::Colon;
                out.push(ch);
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                last = Token::Value;
                out.push(c);
            }
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
        last = if string_is_key { Token::Key } else { Token::Value };
    }
    while let Some(top) = stack.pop() {
        complete_dangling(&mut out, last);
        out.push(top.closer());
        last = Token::Value;
    }
    out
}

fn complete_dangling(out: &mut String, last: Token) {
    match last {
        Token::Comma => {
            let kept = out.trim_end().len();
            out.truncate(kept);
            if out.ends_with(',') {
                out.pop();
            }
        }
        Token::Colon => out.push_str("null"),
        Token::Key => out.push_str(":null"),
        Token::Open | Token::Value => {}
    }
}
