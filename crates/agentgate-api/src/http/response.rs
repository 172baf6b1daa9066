//! Error envelope returned by every failing request.
//!
//! ```json
//! {
//!   "data": null,
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": [{ "code": "AGENT_TIMEOUT", "message": "..." }]
//! }
//! ```
//!
//! Successful responses are the bare payloads (`{reply, session_id}` etc.)
//! that agent callers expect.

use std::time::Instant;

use serde::Serialize;

/// Metadata included in every error envelope.
#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unique request identifier for tracing.
    pub request_id: String,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
}

/// Individual error detail.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub data: Option<()>,
    pub meta: ApiMeta,
    pub errors: Vec<ApiErrorDetail>,
}

/// Request id and start time, captured when a handler begins.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub request_id: String,
    started: Instant,
}

impl RequestMeta {
    pub fn start() -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn to_meta(&self) -> ApiMeta {
        ApiMeta {
            request_id: self.request_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms: self.elapsed_ms(),
        }
    }
}

impl ErrorEnvelope {
    pub fn new(meta: &RequestMeta, code: &str, message: String) -> Self {
        Self {
            data: None,
            meta: meta.to_meta(),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message,
            }],
        }
    }
}
