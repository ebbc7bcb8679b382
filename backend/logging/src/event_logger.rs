//! Execution Event Logger
//!
//! Lifecycle events of a wrapped operation, emitted as structured records at
//! the `holdfast_events` target so they can be routed to their own sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

/// Tracing target for execution events.
pub const EVENT_TARGET: &str = "holdfast_events";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    AttemptStarted {
        attempt: u32,
    },
    AttemptFailed {
        attempt: u32,
        error_msg: String,
        timed_out: bool,
    },
    RetryScheduled {
        attempt: u32,
        delay_ms: u64,
    },
    Succeeded {
        attempt: u32,
        elapsed_ms: u64,
    },
    Exhausted {
        attempts: u32,
        error_msg: String,
        has_stale_data: bool,
    },
    /// A newer execution or disposal cancelled this run.
    Superseded,
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry<'a> {
    pub run_id: Uuid,
    pub cache_key: &'a str,
    pub timestamp: DateTime<Utc>,
    pub event: ExecutionEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Log an execution event with any error text redacted.
    pub fn log_event(run_id: Uuid, cache_key: &str, event: ExecutionEvent) {
        let entry = EventLogEntry {
            run_id,
            cache_key,
            timestamp: Utc::now(),
            event: Self::redacted(event),
        };

        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: EVENT_TARGET, run_id = %run_id, cache_key = %cache_key, event = %json, "Execution event"),
            Err(e) => info!(target: EVENT_TARGET, run_id = %run_id, error = %e, "Execution event (unserializable)"),
        }
    }

    fn redacted(mut event: ExecutionEvent) -> ExecutionEvent {
        match &mut event {
            ExecutionEvent::AttemptFailed { error_msg, .. }
            | ExecutionEvent::Exhausted { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_are_redacted() {
        let event = EventLogger::redacted(ExecutionEvent::AttemptFailed {
            attempt: 0,
            error_msg: "401 with Bearer abc.def.ghi".to_string(),
            timed_out: false,
        });
        let ExecutionEvent::AttemptFailed { error_msg, .. } = event else {
            panic!("variant changed");
        };
        assert!(!error_msg.contains("abc.def.ghi"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(ExecutionEvent::RetryScheduled {
            attempt: 1,
            delay_ms: 1_000,
        })
        .unwrap();
        assert_eq!(json["type"], "retry_scheduled");
        assert_eq!(json["delay_ms"], 1_000);
    }
}
