//! HTTP request handlers.

pub mod chat;
pub mod delegate;
pub mod health;
