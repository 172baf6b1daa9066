//! Scoped state rules.
//!
//! A state delta is split into app, user and session parts by key prefix.
//! App and user parts are stored without their prefix in shared records and
//! merged back under the prefix when a session is read.

use agentgate_types::session::{APP_PREFIX, Event, Session, StateMap, StateScope, USER_PREFIX};

/// A state delta split by storage scope. `temp:` keys are dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScopedDelta {
    /// App-wide keys, prefix stripped.
    pub app: StateMap,
    /// Per-user keys, prefix stripped.
    pub user: StateMap,
    /// Session-local keys, unchanged.
    pub session: StateMap,
}

impl ScopedDelta {
    pub fn is_empty(&self) -> bool {
        self.app.is_empty() && self.user.is_empty() && self.session.is_empty()
    }
}

pub fn partition_delta(delta: &StateMap) -> ScopedDelta {
    let mut scoped = ScopedDelta::default();
    for (key, value) in delta {
        match StateScope::of(key) {
            (StateScope::App, bare) => {
                scoped.app.insert(bare.to_string(), value.clone());
            }
            (StateScope::User, bare) => {
                scoped.user.insert(bare.to_string(), value.clone());
            }
            (StateScope::Temp, _) => {}
            (StateScope::Session, bare) => {
                scoped.session.insert(bare.to_string(), value.clone());
            }
        }
    }
    scoped
}

/// Overlay app and user state onto a session's own state under their prefixes.
pub fn merge_state(session: &mut Session, app_state: &StateMap, user_state: &StateMap) {
    for (key, value) in app_state {
        session
            .state
            .insert(format!("{APP_PREFIX}{key}"), value.clone());
    }
    for (key, value) in user_state {
        session
            .state
            .insert(format!("{USER_PREFIX}{key}"), value.clone());
    }
}

/// Apply an event to the in-memory session: non-temp state keys, the event
/// itself and the update time.
///
/// Stores call this only once the event is persisted, so a failed write
/// leaves the caller's session untouched.
pub fn apply_event(session: &mut Session, event: &Event) {
    for (key, value) in &event.actions.state_delta {
        if StateScope::of(key).0 != StateScope::Temp {
            session.state.insert(key.clone(), value.clone());
        }
    }
    session.last_update_time = event.timestamp;
    session.events.push(event.clone());
}

/// The event as it should be stored: `temp:` keys removed from its delta.
pub fn storable_event(mut event: Event) -> Event {
    event
        .actions
        .state_delta
        .retain(|key, _| StateScope::of(key).0 != StateScope::Temp);
    event
}
