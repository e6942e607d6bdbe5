//! Matching handlers.
//!
//! - `MatchingCoordinator` - One transactional matching invocation
//! - `RetryPolicy` - Backoff between conflicting attempts

mod coordinator;
mod retry;

pub use coordinator::{MatchingCoordinator, MatchingError, MatchingOutcome};
pub use retry::{RetryError, RetryPolicy};
