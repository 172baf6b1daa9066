//! Long-term memory abstractions for agentgate.
//!
//! This module defines the `MemoryRepository` trait that the store backends
//! implement, and the keyword search they share.

pub mod repository;
pub mod search;
