//! Participant domain module.
//!
//! People who can be paired, their organization and preferred timeslots.
//!
//! # Events
//!
//! - `ParticipantCreated` - A new participant joined
//! - `ParticipantUpdated` - A participant's document changed

mod aggregate;
mod events;

pub use aggregate::Participant;
pub use events::{ParticipantCreated, ParticipantUpdated};
