//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timeslots, errors, events)
//! - `participant` - People who can be paired
//! - `session` - One-on-one sessions and the factory that schedules them
//! - `matching` - Pure pairing services (history, partitioning, greedy pairing)

pub mod foundation;
pub mod matching;
pub mod participant;
pub mod session;
