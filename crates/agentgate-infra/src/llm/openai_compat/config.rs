//! Configuration for the OpenAI-compatible provider.
//!
//! agentgate talks to a single chat completion endpoint (OpenAI itself or any
//! gateway that speaks its protocol, e.g. LiteLLM), configured from
//! `AGENT__MODEL__*`.

use secrecy::{ExposeSecret, SecretString};

use agentgate_types::config::ModelSettings;
use agentgate_types::llm::ProviderCapabilities;

/// Context window assumed for an arbitrary OpenAI-compatible model.
const DEFAULT_CONTEXT_TOKENS: u32 = 128_000;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name, reported as `gen_ai.system`.
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Whole-request timeout for one completion call.
    pub timeout_secs: u64,
    pub capabilities: ProviderCapabilities,
}

impl OpenAiCompatConfig {
    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self {
            provider_name: "openai_compatible".into(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.name.clone(),
            timeout_secs: settings.timeout_secs,
            capabilities: ProviderCapabilities {
                tool_calling: true,
                max_context_tokens: DEFAULT_CONTEXT_TOKENS,
                max_output_tokens: settings.max_tokens,
            },
        }
    }

    pub(super) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = ModelSettings {
            name: "gpt-4o-mini".to_string(),
            base_url: "http://litellm:4000/v1/".to_string(),
            api_key: SecretString::from("sk-test".to_string()),
            max_tokens: 2048,
            temperature: None,
            timeout_secs: 45,
        };
        let config = OpenAiCompatConfig::from_settings(&settings);
        assert_eq!(config.base_url, "http://litellm:4000/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_secs, 45);
        assert_eq!(config.api_key(), "sk-test");
        assert!(config.capabilities.tool_calling);
        assert_eq!(config.capabilities.max_output_tokens, 2048);
    }
}
