//! POST /delegate - accept a task from the master agent.
//!
//! Creates a fresh session, answers at once and runs the agent in the
//! background. The run's outcome reaches the master agent only through the
//! `send_response_to_master_agent` tool; failures are logged.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use agentgate_observe::genai_attrs::OP_INVOKE_AGENT;
use agentgate_types::error::AgentError;

use crate::http::error::{ApiError, AppError};
use crate::http::response::RequestMeta;
use crate::state::AppState;

pub const ACCEPTED_MESSAGE: &str =
    "Tell user that the request is being processed. Ask User to wait for the response.";

#[derive(Debug, Deserialize)]
pub struct DelegateRequest {
    pub parent_session_id: String,
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DelegateResponse {
    pub message: String,
    pub session_id: String,
}

pub async fn delegate(
    State(state): State<AppState>,
    payload: Result<Json<DelegateRequest>, JsonRejection>,
) -> Result<Json<DelegateResponse>, ApiError> {
    let meta = RequestMeta::start();
    let Json(request) = payload.map_err(|e| AppError::from(e).with_meta(&meta))?;
    if request.user_id.trim().is_empty() || request.message.trim().is_empty() {
        return Err(AppError::Validation("user_id and message must not be empty".to_string())
            .with_meta(&meta));
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    state
        .runner
        .create_new_session(&request.user_id, Some(&session_id))
        .await
        .map_err(|e| AppError::from(e).with_meta(&meta))?;

    let span = tracing::info_span!(
        "gen_ai.invoke_agent",
        gen_ai.operation.name = OP_INVOKE_AGENT,
        gen_ai.agent.name = %state.settings.agent.name,
        request_id = %meta.request_id,
        session_id = %session_id,
        parent_session_id = %request.parent_session_id,
    );
    let runner = state.runner.clone();
    let timeout = state.request_timeout;
    let task_session_id = session_id.clone();
    tokio::spawn(
        async move {
            let run = runner.run_delegated(
                &request.parent_session_id,
                &task_session_id,
                &request.user_id,
                &request.message,
            );
            match tokio::time::timeout(timeout, run).await {
                Ok(Ok(reply)) => {
                    tracing::info!(reply_chars = reply.chars().count(), "delegated task finished");
                }
                Ok(Err(e)) => log_failure(&e),
                Err(_) => {
                    tracing::error!(timeout_secs = timeout.as_secs(), "delegated task timed out");
                }
            }
        }
        .instrument(span),
    );

    Ok(Json(DelegateResponse {
        message: ACCEPTED_MESSAGE.to_string(),
        session_id,
    }))
}

fn log_failure(error: &AgentError) {
    tracing::error!(error = %error, "delegated task failed");
}
