//! Keyword matching over archived events.
//!
//! Words are maximal runs of ASCII letters, compared lower-cased. An event
//! matches when any query word appears among its text words.

use std::collections::HashSet;

use agentgate_types::memory::{MemoryEntry, SearchMemoryResponse};
use agentgate_types::session::{Event, Session};

pub fn extract_words_lower(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// The events of a session worth archiving: those with content parts.
pub fn memorable_events(session: &Session) -> Vec<Event> {
    session
        .events
        .iter()
        .filter(|e| e.has_parts())
        .cloned()
        .collect()
}

/// Search archived events for `query`, newest match first.
///
/// Callers that cap the number of recalled entries therefore keep the most
/// recent ones. A query with no words matches nothing.
pub fn search_events<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    query: &str,
) -> SearchMemoryResponse {
    let query_words = extract_words_lower(query);
    let mut response = SearchMemoryResponse::default();
    if query_words.is_empty() {
        return response;
    }

    let mut events: Vec<&Event> = events.into_iter().collect();
    events.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
    for event in events {
        let Some(text) = event.text() else {
            continue;
        };
        let event_words = extract_words_lower(&text);
        if query_words.iter().any(|w| event_words.contains(w)) {
            if let Some(entry) = MemoryEntry::from_event(event) {
                response.memories.push(entry);
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_types::session::{Content, StateMap};

    fn text_event(author: &str, text: &str) -> Event {
        Event::new("inv", author).with_content(Content::user_text(text))
    }

    #[test]
    fn test_extract_words_lower() {
        let words = extract_words_lower("Hello, WORLD! it's 2024 café");
        assert!(words.contains("hello"));
        assert!(words.contains("world"));
        assert!(words.contains("it"));
        assert!(words.contains("s"));
        assert!(words.contains("caf"));
        assert!(!words.iter().any(|w| w.contains('2')));
    }

    #[test]
    fn test_search_matches_any_word_case_insensitive() {
        let events = vec![
            text_event("user", "What's the weather in Paris?"),
            text_event("helper", "It is sunny."),
            text_event("user", "Book a flight"),
        ];
        let found = search_events(&events, "PARIS flights");
        assert_eq!(found.memories.len(), 1);
        assert_eq!(found.memories[0].author, "user");
        assert!(found.memories[0].text().contains("Paris"));
    }

    #[test]
    fn test_search_orders_newest_first() {
        let events: Vec<Event> = (0..30)
            .map(|i| {
                let mut event = text_event("user", &format!("note {i} about weather"));
                event.timestamp = i as f64;
                event
            })
            .collect();
        let found = search_events(events.iter().rev().skip(5).chain(events.iter().rev().take(5)), "weather");
        assert_eq!(found.memories.len(), 30);
        assert_eq!(found.memories[0].text(), "note 29 about weather");
        assert_eq!(found.memories[29].text(), "note 0 about weather");
    }

    #[test]
    fn test_search_without_query_words_is_empty() {
        let events = vec![text_event("user", "hello")];
        assert!(search_events(&events, "123 !!").memories.is_empty());
    }

    #[test]
    fn test_memorable_events_skips_contentless() {
        let session = Session {
            id: "s1".to_string(),
            app_name: "app".to_string(),
            user_id: "u1".to_string(),
            state: StateMap::new(),
            events: vec![
                Event::new("inv", "user"),
                text_event("user", "remember me"),
            ],
            last_update_time: 0.0,
        };
        let kept = memorable_events(&session);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text().as_deref(), Some("remember me"));
    }
}
