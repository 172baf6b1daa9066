//! POST /chat - answer one user message.
//!
//! The agent run is bounded by the request timeout; expiry answers 504
//! `AGENT_TIMEOUT`. Events appended before the deadline stay in the session.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use agentgate_observe::genai_attrs::OP_INVOKE_AGENT;

use crate::http::error::{ApiError, AppError};
use crate::http::response::RequestMeta;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let meta = RequestMeta::start();
    let Json(request) = payload.map_err(|e| AppError::from(e).with_meta(&meta))?;

    let span = tracing::info_span!(
        "gen_ai.invoke_agent",
        gen_ai.operation.name = OP_INVOKE_AGENT,
        gen_ai.agent.name = %state.settings.agent.name,
        request_id = %meta.request_id,
        user_id = %request.user_id,
    );

    let run = state.runner.chat(
        &request.user_id,
        request.session_id.as_deref(),
        &request.message,
    );
    let outcome = tokio::time::timeout(state.request_timeout, run.instrument(span))
        .await
        .map_err(|_| AppError::Timeout(state.request_timeout.as_secs()).with_meta(&meta))?
        .map_err(|e| AppError::from(e).with_meta(&meta))?;

    tracing::info!(
        request_id = %meta.request_id,
        session_id = %outcome.session_id,
        elapsed_ms = meta.elapsed_ms(),
        "chat answered"
    );
    Ok(Json(ChatResponse {
        reply: outcome.reply,
        session_id: outcome.session_id,
    }))
}
