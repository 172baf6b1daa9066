//! Session and event types.
//!
//! A `Session` is one conversation thread between a user and the agent,
//! namespaced by app name. Its `events` are the ordered turns: user text,
//! model text, tool calls and tool responses. Each event may carry a state
//! delta that is applied to session, user or app scoped state depending on
//! the key prefix (see [`StateScope`]).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Session state: string keys to arbitrary JSON values.
pub type StateMap = BTreeMap<String, serde_json::Value>;

/// Keys with this prefix are shared by every user of the app.
pub const APP_PREFIX: &str = "app:";
/// Keys with this prefix are shared by every session of one user.
pub const USER_PREFIX: &str = "user:";
/// Keys with this prefix live only for the current invocation and are never stored.
pub const TEMP_PREFIX: &str = "temp:";

/// Where a state key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    App,
    User,
    Temp,
    Session,
}

impl StateScope {
    /// Classify a state key by its prefix and return the key without it.
    ///
    /// Session keys are returned unchanged.
    pub fn of(key: &str) -> (StateScope, &str) {
        if let Some(rest) = key.strip_prefix(APP_PREFIX) {
            (StateScope::App, rest)
        } else if let Some(rest) = key.strip_prefix(USER_PREFIX) {
            (StateScope::User, rest)
        } else if let Some(rest) = key.strip_prefix(TEMP_PREFIX) {
            (StateScope::Temp, rest)
        } else {
            (StateScope::Session, key)
        }
    }
}

/// A persisted conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    #[serde(default)]
    pub state: StateMap,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Seconds since the Unix epoch of the last appended event.
    pub last_update_time: f64,
}

/// One turn or action inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Groups every event produced by one agent run.
    pub invocation_id: String,
    /// `"user"` or the agent name.
    pub author: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default)]
    pub actions: EventActions,
}

impl Event {
    /// A new event stamped with a fresh v7 id and the current time.
    pub fn new(invocation_id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            timestamp: now_timestamp(),
            content: None,
            actions: EventActions::default(),
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_state_delta(mut self, delta: StateMap) -> Self {
        self.actions.state_delta = delta;
        self
    }

    /// Concatenated text parts, or `None` when the event carries no text.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let texts: Vec<&str> = content.parts.iter().filter_map(Part::as_text).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(" "))
        }
    }

    /// Whether the event has content with at least one part.
    pub fn has_parts(&self) -> bool {
        self.content.as_ref().is_some_and(|c| !c.parts.is_empty())
    }
}

/// Side effects recorded on an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventActions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state_delta: StateMap,
}

/// Message content of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// `"user"` or `"model"`.
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

/// One piece of event content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        id: String,
        name: String,
        args: serde_json::Value,
    },
    FunctionResponse {
        id: String,
        name: String,
        response: serde_json::Value,
    },
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Filters applied when reading a session's events.
#[derive(Debug, Clone, Default)]
pub struct GetSessionConfig {
    /// Keep only the last N events.
    pub num_recent_events: Option<usize>,
    /// Keep only events at or after this timestamp.
    pub after_timestamp: Option<f64>,
}

impl GetSessionConfig {
    pub fn apply(&self, events: &mut Vec<Event>) {
        if let Some(n) = self.num_recent_events.filter(|n| *n > 0) {
            if events.len() > n {
                events.drain(..events.len() - n);
            }
        }
        if let Some(after) = self.after_timestamp {
            events.retain(|e| e.timestamp >= after);
        }
    }
}

/// Current time as float seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Render a float epoch timestamp as RFC 3339.
pub fn format_timestamp(ts: f64) -> String {
    let secs = ts.trunc() as i64;
    let nanos = ((ts.fract()) * 1_000_000_000.0) as u32;
    let dt: Option<DateTime<Utc>> = Utc.timestamp_opt(secs, nanos).single();
    dt.map(|d| d.to_rfc3339()).unwrap_or_default()
}
