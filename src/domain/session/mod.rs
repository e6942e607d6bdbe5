//! Session domain module.
//!
//! Sessions pair two participants in one timeslot, one week after the
//! pairing is committed.
//!
//! # Events
//!
//! - `SessionScheduled` - Published when the matching engine commits a session
//! - `SessionUpdated` - Published by the platform when a session changes

mod aggregate;
mod events;

pub use aggregate::{ParticipantPair, Session, SESSION_LEAD_DAYS};
pub use events::{SessionScheduled, SessionUpdated};
