//! HTTP API layer for agentgate.
//!
//! Axum routes for chat, delegated tasks and health, with an error envelope
//! and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
