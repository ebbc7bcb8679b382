use thiserror::Error;

/// Message placed into state when an attempt exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "Request timeout - taking too long to respond";

/// Fallback message for failures that carry no usable description.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Top-level error type for the Holdfast operation wrapper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HoldfastError {
    /// The deadline fired before the operation settled.
    #[error("Request timeout - taking too long to respond")]
    Timeout,

    /// The wrapped operation failed; the message is passed through verbatim.
    #[error("{0}")]
    Operation(String),

    /// The persistence medium could not be read or written.
    #[error("cache I/O error: {0}")]
    CacheIo(String),

    /// The attempt was superseded by a newer execution or the executor was disposed.
    #[error("operation cancelled")]
    Cancelled,
}

impl HoldfastError {
    /// Whether the retry policy may schedule another attempt after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HoldfastError::Timeout | HoldfastError::Operation(_))
    }

    /// The caller-visible message for this failure.
    pub fn user_message(&self) -> String {
        match self {
            HoldfastError::Operation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Reduce an operation error to the string that is exposed in state.
///
/// Only the outermost message is kept; context chains and backtraces are
/// never surfaced to consumers.
pub fn normalize_error_message(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if msg.trim().is_empty() {
        UNKNOWN_ERROR_MESSAGE.to_string()
    } else {
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn timeout_message_mentions_timeout() {
        assert!(HoldfastError::Timeout.to_string().to_lowercase().contains("timeout"));
    }

    #[test]
    fn operation_message_is_verbatim() {
        let err = HoldfastError::Operation("HTTP 503: upstream busy".into());
        assert_eq!(err.user_message(), "HTTP 503: upstream busy");
    }

    #[test]
    fn normalize_keeps_outer_context_only() {
        let err = Err::<(), _>(anyhow!("socket closed"))
            .context("Failed to load reports")
            .unwrap_err();
        assert_eq!(normalize_error_message(&err), "Failed to load reports");
    }

    #[test]
    fn normalize_blank_message_falls_back() {
        assert_eq!(normalize_error_message(&anyhow!("  ")), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn cache_and_cancel_are_not_retryable() {
        assert!(HoldfastError::Timeout.is_retryable());
        assert!(!HoldfastError::CacheIo("disk full".into()).is_retryable());
        assert!(!HoldfastError::Cancelled.is_retryable());
    }
}
