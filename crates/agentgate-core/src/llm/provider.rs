//! LlmProvider trait definition.
//!
//! This is the core abstraction that every chat completion backend
//! implements. Uses RPITIT for `complete`; `BoxLlmProvider` erases the type
//! for runtime selection.

use agentgate_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for LLM provider backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Implementations live in agentgate-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai_compatible").
    fn name(&self) -> &str;

    /// What this provider supports (tool calling, context size).
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
