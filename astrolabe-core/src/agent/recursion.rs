use super::events::{AgentEvent, EventEmitter};
use super::models::{AdditionalInfo, ChatResponse};
use super::runtime::parser::generate_call_id;
use super::runtime::repair::repair_json;
use crate::constants::DEPTH_EXHAUSTED_NOTICE;
use crate::domain::types::FunctionCall;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

struct Frame {
    depth: usize,
    calls: Vec<FunctionCall>,
    /// Index into `completed` where this level's calls begin.
    start: usize,
}

/// Calls executed on the way down a recursion chain, one frame per level.
#[derive(Default)]
pub(super) struct RecursionTrail {
    frames: Vec<Frame>,
    completed: Vec<FunctionCall>,
    executed_ids: HashSet<String>,
}

impl RecursionTrail {
    /// Drop calls that already ran on this chain, or that repeat an id within
    /// the batch. Calls that arrive without an id are given one first.
    pub(super) fn fresh(&self, calls: Vec<FunctionCall>) -> Vec<FunctionCall> {
        let mut batch = HashSet::new();
        calls
            .into_iter()
            .map(|mut call| {
                if call.id.trim().is_empty() {
                    call.id = generate_call_id();
                }
                call
            })
            .filter(|call| !self.executed_ids.contains(&call.id) && batch.insert(call.id.clone()))
            .collect()
    }

    /// Record the executed calls that lead into level `depth`.
    pub(super) fn record(&mut self, depth: usize, calls: &[FunctionCall]) {
        self.executed_ids
            .extend(calls.iter().map(|call| call.id.clone()));
        self.frames.push(Frame {
            depth,
            calls: calls.to_vec(),
            start: self.completed.len(),
        });
        self.completed.extend_from_slice(calls);
    }

    pub(super) fn completed(&self) -> &[FunctionCall] {
        &self.completed
    }

    /// Emit `recursion_end` for every level, innermost first.
    pub(super) fn unwind(&self, final_content: &str, events: &EventEmitter) {
        for frame in self.frames.iter().rev() {
            events.emit(AgentEvent::RecursionEnd {
                final_content: final_content.to_string(),
                function_calls: frame.calls.clone(),
                depth: frame.depth,
                completed_function_calls: self.completed[frame.start..].to_vec(),
            });
        }
    }
}

/// Content of a level that hit the depth bound.
pub(super) fn exhausted_content(text: &str, with_notice: bool) -> String {
    if !with_notice {
        return text.to_string();
    }
    if text.trim().is_empty() {
        DEPTH_EXHAUSTED_NOTICE.to_string()
    } else {
        format!("{DEPTH_EXHAUSTED_NOTICE}\n\n{text}")
    }
}

/// Build the terminal response, coercing `text` to JSON when asked to.
pub(super) fn final_response(
    text: String,
    wants_json: bool,
    model: String,
    function_calls: Vec<FunctionCall>,
    additional_info: AdditionalInfo,
) -> ChatResponse {
    let (content, is_json_response) = if wants_json {
        coerce_json(text)
    } else {
        (Value::String(text), false)
    };
    ChatResponse {
        content,
        is_json_response,
        is_last: true,
        model,
        function_calls,
        additional_info,
    }
}

fn coerce_json(text: String) -> (Value, bool) {
    match repair_json(&text) {
        Some(value) => (value, true),
        None => {
            warn!(
                length = text.len(),
                "JSON response requested but content is not JSON; returning text"
            );
            (Value::String(text), false)
        }
    }
}
