//! LLM provider implementations.
//!
//! Contains the concrete implementation of the [`LlmProvider`] trait defined
//! in `agentgate-core` and the factory that builds it from settings.
//!
//! [`LlmProvider`]: agentgate_core::llm::provider::LlmProvider

pub mod openai_compat;

use agentgate_core::llm::box_provider::BoxLlmProvider;
use agentgate_types::config::ModelSettings;
use agentgate_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create the [`BoxLlmProvider`] described by `AGENT__MODEL__*`.
pub fn build_provider(settings: &ModelSettings) -> Result<BoxLlmProvider, LlmError> {
    let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_settings(settings))?;
    tracing::debug!(
        model = %settings.name,
        base_url = %settings.base_url,
        "configured OpenAI-compatible provider"
    );
    Ok(BoxLlmProvider::new(provider))
}
