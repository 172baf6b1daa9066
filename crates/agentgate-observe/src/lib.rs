//! Observability for agentgate: tracing subscriber setup and the GenAI
//! semantic-convention values used on agent spans.

pub mod genai_attrs;
pub mod tracing_setup;
