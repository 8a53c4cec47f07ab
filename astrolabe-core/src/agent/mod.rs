//! Tool-calling orchestration.
//!
//! [`Agent`] wraps a [`BaseModel`](crate::model::BaseModel) and a
//! [`ToolRegistry`](crate::tooling::ToolRegistry). Each request loops through
//! model call, tool-call extraction, tool execution and a follow-up prompt
//! until the model answers without requesting tools or the configured depth
//! is exhausted. [`Agent::chat`] returns the final answer;
//! [`Agent::chat_stream`] yields it incrementally.

mod dedup;
mod errors;
mod events;
mod models;
mod recursion;
mod runner;
mod runtime;
mod streaming;


pub use crate::domain::types::FunctionCall;
pub use errors::AgentError;
pub use events::{AgentEvent, EventSink, NoopSink};
pub use models::{AdditionalInfo, ChatResponse, StreamChunk};
pub use runner::Agent;
pub use runtime::instructions::{
    AdaptedRequest, adapt_request, build_follow_up_prompt, summarize_results,
    tool_protocol_instructions,
};
pub use runtime::parser::{
    format_tagged_calls, generate_call_id, has_complete_function_call_tags, parse_function_calls,
    parse_function_calls_value, remove_tagged_function_calls,
};
pub use runtime::repair::{repair_json, safe_parse};
