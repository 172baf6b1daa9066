//! MCP client over streamable HTTP.
//!
//! Every gateway call opens a short-lived MCP session: `initialize`, the
//! `notifications/initialized` notification, the actual request, then a
//! best-effort DELETE to release the server-side session.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use agentgate_core::gateway::connector::McpConnector;
use agentgate_types::error::GatewayError;
use agentgate_types::gateway::{CallToolResult, InitializeResult, ListToolsResult, McpTool};
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::jsonrpc::{
    JsonRpcNotification, JsonRpcRequest, decode_body, decode_event_data, missing_response,
};

pub const PROTOCOL_VERSION: &str = "2025-03-26";
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

const CLIENT_NAME: &str = "agentgate";
/// Upper bound on `tools/list` pages followed for one server.
const MAX_TOOL_PAGES: usize = 50;

/// `McpConnector` speaking JSON-RPC over HTTP POST.
pub struct HttpMcpConnector {
    client: reqwest::Client,
    json_response: bool,
    timeout_secs: u64,
    next_id: AtomicI64,
}

impl HttpMcpConnector {
    /// Build a connector whose requests time out after `timeout_secs`.
    ///
    /// With `json_response` set the client only accepts `application/json`
    /// answers; otherwise SSE streams are accepted too.
    pub fn new(timeout_secs: u64, json_response: bool) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            json_response,
            timeout_secs,
            next_id: AtomicI64::new(1),
        })
    }

    fn accept(&self) -> HeaderValue {
        if self.json_response {
            HeaderValue::from_static("application/json")
        } else {
            HeaderValue::from_static("application/json, text/event-stream")
        }
    }

    fn map_reqwest(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    fn post(&self, endpoint: &str, session_id: Option<&str>) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(endpoint)
            .header(ACCEPT, self.accept())
            .header(CONTENT_TYPE, "application/json");
        match session_id {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        }
    }

    /// Send one request and decode the matching result. Returns the session
    /// id the server assigned, if any.
    async fn request(
        &self,
        endpoint: &str,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<(Value, Option<String>), GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = JsonRpcRequest::new(id, method, params);

        let response = self
            .post(endpoint, session_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = response.status();
        let assigned = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_ascii_lowercase();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!(
                "HTTP error {status} from {endpoint}: {}",
                truncate(&text, 200)
            )));
        }

        let result = if content_type.starts_with("text/event-stream") {
            self.read_event_stream(response, id).await?
        } else {
            let text = response.text().await.map_err(|e| self.map_reqwest(e))?;
            decode_body(&text, id)?
        };
        tracing::debug!(endpoint, method, id, "MCP response received");
        Ok((result, assigned))
    }

    /// Consume SSE events until the response to `id` arrives. The rest of
    /// the stream is dropped unread.
    async fn read_event_stream(&self, response: reqwest::Response, id: i64) -> Result<Value, GatewayError> {
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| match e {
                EventStreamError::Transport(e) => self.map_reqwest(e),
                other => GatewayError::Protocol(format!("invalid event stream: {other}")),
            })?;
            if let Some(outcome) = decode_event_data(&event.data, id) {
                return outcome;
            }
        }
        Err(missing_response(id))
    }

    async fn notify(&self, endpoint: &str, session_id: Option<&str>, method: &str) -> Result<(), GatewayError> {
        let response = self
            .post(endpoint, session_id)
            .json(&JsonRpcNotification::new(method))
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "HTTP error {status} for notification {method}"
            )));
        }
        Ok(())
    }

    /// Open a session: initialize plus the initialized notification.
    async fn open(&self, endpoint: &str) -> Result<(InitializeResult, Option<String>), GatewayError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")},
        });
        let (result, session_id) = self.request(endpoint, None, "initialize", params).await?;
        let init: InitializeResult = parse(result)?;

        if let Err(e) = self
            .notify(endpoint, session_id.as_deref(), "notifications/initialized")
            .await
        {
            tracing::warn!(endpoint, error = %e, "initialized notification failed");
        }
        Ok((init, session_id))
    }

    /// Release the server-side session. Servers that do not support
    /// termination answer 405, which is fine.
    async fn close(&self, endpoint: &str, session_id: Option<String>) {
        let Some(id) = session_id else {
            return;
        };
        if let Err(e) = self
            .client
            .delete(endpoint)
            .header(SESSION_HEADER, id)
            .send()
            .await
        {
            tracing::debug!(endpoint, error = %e, "MCP session close failed");
        }
    }

    async fn fetch_tools(&self, endpoint: &str, session_id: Option<&str>) -> Result<Vec<McpTool>, GatewayError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_TOOL_PAGES {
            let params = match &cursor {
                Some(c) => json!({"cursor": c}),
                None => json!({}),
            };
            let (result, _) = self.request(endpoint, session_id, "tools/list", params).await?;
            let page: ListToolsResult = parse(result)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
        tracing::warn!(endpoint, pages = MAX_TOOL_PAGES, "tools/list pagination cut short");
        Ok(tools)
    }
}

impl McpConnector for HttpMcpConnector {
    async fn initialize(&self, endpoint: &str) -> Result<InitializeResult, GatewayError> {
        let (init, session_id) = self.open(endpoint).await?;
        self.close(endpoint, session_id).await;
        Ok(init)
    }

    async fn list_tools(&self, endpoint: &str) -> Result<Vec<McpTool>, GatewayError> {
        let (_, session_id) = self.open(endpoint).await?;
        let result = self.fetch_tools(endpoint, session_id.as_deref()).await;
        self.close(endpoint, session_id).await;
        result
    }

    async fn call_tool(
        &self,
        endpoint: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, GatewayError> {
        let (_, session_id) = self.open(endpoint).await?;
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = self
            .request(endpoint, session_id.as_deref(), "tools/call", params)
            .await
            .and_then(|(value, _)| parse(value));
        self.close(endpoint, session_id).await;
        result
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Protocol(format!("unexpected result shape: {e}")))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
