//! `holdfast-executor`: resilient execution of a single async operation.
//!
//! Provides:
//! - `DeadlineGuard`: per-attempt timeout with an abort signal
//! - `OperationExecutor`: cache seeding, linear backoff retries, supersession
//!   and disposal around one operation, with observable state

pub mod deadline;
pub mod executor;

pub use deadline::{run_with_deadline, DeadlineGuard, DEFAULT_TIMEOUT};
pub use executor::{ExecutorData, OperationExecutor};
