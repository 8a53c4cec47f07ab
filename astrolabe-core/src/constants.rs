//! Application constants
//!
//! Single source of truth for paths, protocol markers and tunable defaults.

/// Default agent configuration file path
pub const CONFIG_PATH: &str = "config/agent.toml";

/// Opening marker of a tagged tool-call span
pub const START_TOOL_CALLS: &str = "<==start_tool_calls==>";

/// Closing marker of a tagged tool-call span
pub const END_TOOL_CALLS: &str = "<==end_tool_calls==>";

/// JSON key holding the requested calls inside a span
pub const FUNCTION_CALLS_KEY: &str = "function_calls";

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 25;

/// Minimum buffered bytes before a streamed fragment is flushed
pub const DEFAULT_FLUSH_THRESHOLD: usize = 64;

/// Shorter fragments and paragraphs are never treated as duplicates
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 8;

pub const DEPTH_EXHAUSTED_NOTICE: &str =
    "[Maximum recursion depth reached; the result may be incomplete.]";
