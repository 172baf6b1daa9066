//! OpenTelemetry GenAI semantic-convention values.
//!
//! Span field names must be literals in `tracing` macros, so only the values
//! live here. Span naming convention: `"gen_ai.{operation}"`; the engine's
//! `gen_ai.chat` and `gen_ai.execute_tool` spans nest under the invocation.

/// Agent invocation (one `/chat` or `/delegate` run).
pub const OP_INVOKE_AGENT: &str = "invoke_agent";
