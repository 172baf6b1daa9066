//! Redis key layout.
//!
//! ```text
//! session:{app}:{user}:{session_id}   string, JSON session document
//! state:app:{app}                     string, JSON object of app state
//! state:user:{app}:{user}             string, JSON object of user state
//! memory:{app}:{user}                 hash, session_id -> JSON event array
//! ```
//!
//! Every component is escaped with [`component`], so no caller-supplied id
//! can contain the `:` separator or a glob metacharacter. Distinct
//! `(app, user, session)` triples always map to distinct keys.

use std::fmt::Write;

/// Percent-encode the bytes that would let one id alias another key or act
/// as a `KEYS` glob: `%`, `:`, `*`, `?`, `[`, `]` and `\`.
pub fn component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' | ':' | '*' | '?' | '[' | ']' | '\\' => {
                let _ = write!(out, "%{:02X}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

pub fn session_key(app_name: &str, user_id: &str, session_id: &str) -> String {
    format!(
        "{}{}",
        session_prefix(app_name, user_id),
        component(session_id)
    )
}

/// Every session key of one user starts with this prefix.
pub fn session_prefix(app_name: &str, user_id: &str) -> String {
    format!("session:{}:{}:", component(app_name), component(user_id))
}

/// Glob matching every session of one user.
pub fn session_pattern(app_name: &str, user_id: &str) -> String {
    format!("{}*", session_prefix(app_name, user_id))
}

pub fn app_state_key(app_name: &str) -> String {
    format!("state:app:{}", component(app_name))
}

pub fn user_state_key(app_name: &str, user_id: &str) -> String {
    format!("state:user:{}:{}", component(app_name), component(user_id))
}

pub fn memory_key(app_name: &str, user_id: &str) -> String {
    format!("memory:{}:{}", component(app_name), component(user_id))
}
