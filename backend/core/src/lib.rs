pub mod clock;
pub mod error;
pub mod state;
pub mod traits;

pub use clock::{ManualClock, SystemClock};
pub use error::{normalize_error_message, HoldfastError, TIMEOUT_MESSAGE, UNKNOWN_ERROR_MESSAGE};
pub use state::{ExecutionState, Status};
pub use traits::{Clock, Operation};

// Re-exported so operation authors need not depend on tokio-util directly.
pub use tokio_util::sync::CancellationToken;
