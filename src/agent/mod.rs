//! Agent system: the function calling loop and the operations it can
//! dispatch.
//!
//! The loop asks the model for a turn, executes any function calls it
//! requested against the workspace, feeds the results back, and repeats
//! until the model answers in plain text or the round limit is hit.

mod runner;
mod tools;

pub use runner::{Agent, AgentResponse, TokenUsage, ToolCallRecord};
pub use tools::{dispatch, parse_tool_call, tool_declarations, FunctionResult, ToolCall};
