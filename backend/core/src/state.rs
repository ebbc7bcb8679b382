use serde::{Deserialize, Serialize};

/// Lifecycle status of an executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No execution has started yet.
    #[default]
    Idle,
    /// An attempt (first or retry) is in flight or waiting on its retry delay.
    Loading,
    Success,
    Failed,
}

/// Observable state of one wrapped operation.
///
/// `data` may hold a cache snapshot while `status` is still `Idle`; in that
/// case `is_from_cache` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState<T> {
    pub data: Option<T>,
    pub status: Status,
    pub error_message: Option<String>,
    pub is_from_cache: bool,
    pub attempt: u32,
}

impl<T> Default for ExecutionState<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: Status::Idle,
            error_message: None,
            is_from_cache: false,
            attempt: 0,
        }
    }
}

impl<T> ExecutionState<T> {
    /// State seeded from a cache snapshot before any execution.
    pub fn from_cache(data: T) -> Self {
        Self {
            data: Some(data),
            is_from_cache: true,
            ..Self::default()
        }
    }

    /// True while an attempt is pending.
    ///
    /// The pre-execution `Idle` state also reports loading: callers are
    /// expected to call `execute()` immediately after construction.
    pub fn is_loading(&self) -> bool {
        matches!(self.status, Status::Idle | Status::Loading)
    }

    /// True while a retry (not the first attempt) is in flight.
    pub fn is_retrying(&self) -> bool {
        self.attempt > 0 && self.status == Status::Loading
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// Whether `data` is a stale snapshot that may be shown next to an error.
    pub fn has_stale_data(&self) -> bool {
        self.is_from_cache && self.data.is_some()
    }
}
