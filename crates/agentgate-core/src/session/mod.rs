//! Session persistence abstractions for agentgate.
//!
//! `SessionRepository` is the port the store backends implement; `state`
//! holds the scope rules shared by every backend.

pub mod repository;
pub mod state;
