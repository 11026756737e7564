// Copyright (c) 2026 Agora Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only, causally linked record of every API call and its outcome.

use crate::domain::error::PlatformError;
use crate::domain::events::{Event, EventType};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// The platform's audit trail.
///
/// Appends from concurrent calls may interleave, but each call's
/// (`API_CALL`, terminal) pair stays linked through the call's id.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
    next_id: AtomicU64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound API call. Returns the event id terminal events
    /// must reference.
    pub fn api_call(&self, method: &str, params: serde_json::Value) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.append(Event {
            id,
            event_type: EventType::ApiCall,
            related_id: None,
            method_name: method.to_string(),
            params,
            timestamp: Utc::now(),
        });
        id
    }

    pub fn api_response(&self, related_id: u64, method: &str) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.append(Event {
            id,
            event_type: EventType::ApiResponse,
            related_id: Some(related_id),
            method_name: method.to_string(),
            params: serde_json::Value::Null,
            timestamp: Utc::now(),
        });
    }

    pub fn api_error(&self, related_id: u64, method: &str, message: &str) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.append(Event {
            id,
            event_type: EventType::ApiError,
            related_id: Some(related_id),
            method_name: method.to_string(),
            params: serde_json::json!({ "error": message }),
            timestamp: Utc::now(),
        });
    }

    /// Record the terminal event for `call_id` based on an operation's
    /// outcome.
    pub fn complete<T>(&self, call_id: u64, method: &str, result: &Result<T, PlatformError>) {
        match result {
            Ok(_) => self.api_response(call_id, method),
            Err(err) => self.api_error(call_id, method, &err.to_string()),
        }
    }

    /// The full history in order of append.
    pub fn history(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    fn append(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn terminal_events_reference_their_call() {
        let log = EventLog::new();
        let call = log.api_call("invoke", serde_json::json!({"action": "Add"}));
        log.api_error(call, "invoke", "not found: action Add");

        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_type, EventType::ApiCall);
        assert_eq!(history[1].event_type, EventType::ApiError);
        assert_eq!(history[1].related_id, Some(history[0].id));
    }

    /// Every terminal event's related id resolves to exactly one earlier
    /// API_CALL, even when unrelated calls interleave.
    #[tokio::test]
    async fn causality_survives_concurrent_interleaving() {
        let log = Arc::new(EventLog::new());
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    for j in 0..25 {
                        let call =
                            log.api_call("send", serde_json::json!({"task": i, "round": j}));
                        tokio::task::yield_now().await;
                        if j % 3 == 0 {
                            log.api_error(call, "send", "unreachable");
                        } else {
                            log.api_response(call, "send");
                        }
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let history = log.history();
        assert_eq!(history.len(), 16 * 25 * 2);

        let mut call_positions: HashMap<u64, usize> = HashMap::new();
        for (pos, event) in history.iter().enumerate() {
            match event.event_type {
                EventType::ApiCall => {
                    assert!(
                        call_positions.insert(event.id, pos).is_none(),
                        "duplicate call id {}",
                        event.id
                    );
                }
                EventType::ApiResponse | EventType::ApiError => {
                    let related = event.related_id.expect("terminal event without related id");
                    let call_pos = call_positions
                        .get(&related)
                        .expect("terminal event references unknown call");
                    assert!(*call_pos < pos, "terminal event precedes its call");
                }
            }
        }
    }
}
