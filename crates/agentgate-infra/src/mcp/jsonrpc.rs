//! JSON-RPC 2.0 framing for MCP over streamable HTTP.
//!
//! A server may answer a POST with a plain JSON body or with an SSE stream
//! whose events carry JSON-RPC messages. The HTTP client splits the stream
//! into events; this module picks the response with the expected id out of
//! either form.

use agentgate_types::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: i64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
}

impl<'a> JsonRpcNotification<'a> {
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Any incoming message. Requests and notifications from the server have a
/// `method`; only responses carry `result` or `error`.
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

/// Decode a JSON response body (single message or batch) into the result
/// of request `expected_id`. Server-initiated requests and notifications
/// are skipped.
pub fn decode_body(body: &str, expected_id: i64) -> Result<Value, GatewayError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::Protocol(format!("invalid JSON response: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    for item in items {
        let message: IncomingMessage = serde_json::from_value(item)
            .map_err(|e| GatewayError::Protocol(format!("invalid JSON-RPC message: {e}")))?;
        if let Some(outcome) = response_for(message, expected_id) {
            return outcome;
        }
    }
    Err(missing_response(expected_id))
}

/// Decode the `data` of one SSE event. Returns `None` when the event is not
/// the response to `expected_id`: a notification, another id, or a payload
/// that is not JSON-RPC at all.
pub fn decode_event_data(data: &str, expected_id: i64) -> Option<Result<Value, GatewayError>> {
    if data.trim().is_empty() {
        return None;
    }
    let message = serde_json::from_str::<IncomingMessage>(data).ok()?;
    response_for(message, expected_id)
}

pub fn missing_response(expected_id: i64) -> GatewayError {
    GatewayError::Protocol(format!("missing response for request id {expected_id}"))
}

fn response_for(message: IncomingMessage, expected_id: i64) -> Option<Result<Value, GatewayError>> {
    if message.method.is_some() || !id_matches(message.id.as_ref(), expected_id) {
        return None;
    }
    Some(match message.error {
        Some(error) => Err(GatewayError::Rpc {
            code: error.code,
            message: error.message,
        }),
        None => Ok(message.result.unwrap_or(Value::Null)),
    })
}

fn id_matches(id: Option<&Value>, expected: i64) -> bool {
    match id {
        Some(Value::Number(n)) => n.as_i64() == Some(expected),
        Some(Value::String(s)) => s.parse::<i64>().ok() == Some(expected),
        _ => false,
    }
}
