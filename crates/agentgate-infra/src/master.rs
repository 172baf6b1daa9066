//! Registration with the orchestrating master agent.
//!
//! On startup the agent announces itself by POSTing its name, public URL and
//! agent card to `{MASTER_AGENT__BASE_URL}/register_agent`.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("failed to read agent card {path}: {message}")]
    Card { path: String, message: String },

    #[error("registration request failed: {0}")]
    Request(String),

    #[error("master agent rejected registration with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct RegisterAgentRequest<'a> {
    agent_name: &'a str,
    agent_card: &'a Value,
    agent_base_url: Option<&'a str>,
}

/// Read and parse the agent card JSON.
pub fn load_agent_card(path: &Path) -> Result<Value, RegistrationError> {
    let card_error = |message: String| RegistrationError::Card {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| card_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| card_error(e.to_string()))
}

pub struct MasterAgentClient {
    client: reqwest::Client,
    base_url: String,
}

impl MasterAgentClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RegistrationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RegistrationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn register_url(&self) -> String {
        format!("{}/register_agent", self.base_url)
    }

    pub async fn register(
        &self,
        agent_name: &str,
        agent_card: &Value,
        agent_base_url: Option<&str>,
    ) -> Result<(), RegistrationError> {
        let body = RegisterAgentRequest {
            agent_name,
            agent_card,
            agent_base_url,
        };
        let response = self
            .client
            .post(self.register_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistrationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(url = %self.register_url(), agent_name, "registered with master agent");
        Ok(())
    }
}
