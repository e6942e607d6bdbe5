//! Lifecycle handlers.
//!
//! - `LifecycleReactor` - Decides whether a participant or session change
//!   triggers matching, and releases participants of completed sessions
//! - `MatchingTriggerHandler` - Event bus entry point for the reactor

mod reactor;
mod trigger_handler;

pub use reactor::{LifecycleReactor, ReactorOutcome, SkipReason};
pub use trigger_handler::{MatchingTriggerHandler, TRIGGER_EVENT_TYPES};
