//! Application handlers.
//!
//! Orchestrate domain services against the ports.

pub mod lifecycle;
pub mod matching;

pub use lifecycle::{
    LifecycleReactor, MatchingTriggerHandler, ReactorOutcome, SkipReason, TRIGGER_EVENT_TYPES,
};
pub use matching::{MatchingCoordinator, MatchingError, MatchingOutcome, RetryError, RetryPolicy};
