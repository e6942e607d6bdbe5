//! Application layer - Handlers that drive matching.
//!
//! This layer sequences store transactions, domain planning and event
//! publication. It owns no state of its own.

pub mod handlers;

pub use handlers::{
    LifecycleReactor, MatchingCoordinator, MatchingError, MatchingOutcome, MatchingTriggerHandler,
    ReactorOutcome, RetryPolicy, SkipReason,
};
