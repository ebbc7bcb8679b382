//! Telemetry and structured logging components for Holdfast.
//!
//! Handles log redaction, JSON output with file rotation, and execution
//! lifecycle event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EVENT_TARGET, EventLogEntry, EventLogger, ExecutionEvent};
pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
