//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use agentgate_types::error::{AgentError, GatewayError};
use agentgate_types::llm::LlmError;

use super::response::{ErrorEnvelope, RequestMeta};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Agent, LLM, gateway or store failure.
    Agent(AgentError),
    /// Malformed request body or empty fields.
    Validation(String),
    /// The invocation exceeded `APP__REQUEST_TIMEOUT_SECS`.
    Timeout(u64),
}

impl From<AgentError> for AppError {
    fn from(e: AgentError) -> Self {
        AppError::Agent(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) | AppError::Agent(AgentError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "AGENT_TIMEOUT"),
            AppError::Agent(AgentError::SessionNotFound(_)) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND")
            }
            AppError::Agent(AgentError::Llm(LlmError::Timeout(_)))
            | AppError::Agent(AgentError::Gateway(GatewayError::Timeout(_))) => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT")
            }
            AppError::Agent(AgentError::Llm(_)) => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
            AppError::Agent(AgentError::Gateway(_)) => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            AppError::Agent(AgentError::Repository(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_ERROR")
            }
            AppError::Agent(AgentError::ToolRoundsExceeded(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Agent(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Timeout(secs) => format!("agent did not answer within {secs}s"),
        }
    }

    /// Attach the request's id and timing.
    pub fn with_meta(self, meta: &RequestMeta) -> ApiError {
        ApiError {
            error: self,
            meta: meta.clone(),
        }
    }
}

/// An `AppError` with the metadata of the request that failed.
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub meta: RequestMeta,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.error.status_and_code();
        let message = self.error.message();
        if status.is_server_error() {
            tracing::error!(request_id = %self.meta.request_id, code, %message, "request failed");
        } else {
            tracing::debug!(request_id = %self.meta.request_id, code, %message, "request rejected");
        }
        (status, Json(ErrorEnvelope::new(&self.meta, code, message))).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.with_meta(&RequestMeta::start()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_types::error::RepositoryError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AgentError::Validation("empty".into()).into(), StatusCode::BAD_REQUEST),
            (AppError::Timeout(120), StatusCode::GATEWAY_TIMEOUT),
            (AgentError::SessionNotFound("s1".into()).into(), StatusCode::NOT_FOUND),
            (AgentError::Llm(LlmError::Timeout(60)).into(), StatusCode::GATEWAY_TIMEOUT),
            (
                AgentError::Llm(LlmError::Provider { message: "boom".into() }).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AgentError::Gateway(GatewayError::UnknownServer("x".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AgentError::Repository(RepositoryError::Connection("refused".into())).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AgentError::ToolRoundsExceeded(10).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            let (status, _) = error.status_and_code();
            assert_eq!(status, expected, "{error:?}");
        }
    }

    #[test]
    fn test_timeout_code() {
        assert_eq!(AppError::Timeout(5).status_and_code().1, "AGENT_TIMEOUT");
        assert!(AppError::Timeout(5).message().contains("5s"));
    }
}
