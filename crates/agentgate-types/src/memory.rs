//! Memory types for agentgate.
//!
//! Long-term memory is a per-user archive of past session events. A search
//! returns the text-bearing events that share a keyword with the query.

use serde::{Deserialize, Serialize};

use crate::session::{Content, Event, Part, format_timestamp};

/// A single recalled event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Text parts of the original event only.
    pub content: Content,
    pub author: String,
    /// RFC 3339 rendering of the event timestamp.
    pub timestamp: String,
}

impl MemoryEntry {
    /// Build an entry from a stored event, keeping only its text parts.
    ///
    /// Returns `None` for events without text.
    pub fn from_event(event: &Event) -> Option<Self> {
        let content = event.content.as_ref()?;
        let parts: Vec<Part> = content
            .parts
            .iter()
            .filter(|p| p.as_text().is_some())
            .cloned()
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            content: Content {
                role: content.role.clone(),
                parts,
            },
            author: event.author.clone(),
            timestamp: format_timestamp(event.timestamp),
        })
    }

    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a memory search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchMemoryResponse {
    pub memories: Vec<MemoryEntry>,
}
