pub mod retry;
pub mod timer;

pub use retry::{RetryDecision, RetryPlan, RetryPolicy};
pub use timer::RetryScheduler;
