//! Tool registry and remote tool host seam.
//!
//! Local tools live in a [`ToolRegistry`]; tools served elsewhere are reached
//! through a [`RemoteToolHost`] implementation supplied by the caller.

mod error;
mod interface;
mod registry;

pub use error::ToolInvokeError;
pub use interface::{RemoteToolHost, ToolDefinition};
pub use registry::{FnTool, LocalTool, ToolHandler, ToolRegistry, TypedTool};
