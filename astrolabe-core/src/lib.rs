//! Agent orchestration core.
//!
//! Sits between a text-generating base model and a set of callable tools. The
//! model requests tools through a tagged text protocol embedded in its output;
//! the core parses those requests, runs the tools, feeds the results back and
//! repeats until the model answers without requesting tools or the recursion
//! bound is reached.

pub mod agent;
pub mod config;
pub mod constants;
pub mod domain;
pub mod model;
pub mod telemetry;
pub mod tooling;

pub use agent::{
    Agent, AgentError, AgentEvent, ChatResponse, EventSink, FunctionCall, StreamChunk,
};
pub use config::{AgentConfig, ConfigError, DedupPolicy};
pub use domain::types;
pub use model::{BaseModel, ChatOptions, ModelChunk, ModelError, ModelResponse, ResponseFormat};
pub use tooling::{RemoteToolHost, ToolDefinition, ToolInvokeError, ToolRegistry};
