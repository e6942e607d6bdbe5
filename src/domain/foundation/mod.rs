//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, errors and the event
//! infrastructure that form the vocabulary of the Fika domain.

mod errors;
mod events;
mod ids;
mod timeslot;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{OrganizationId, ParticipantId, SessionId};
pub use timeslot::Timeslot;
pub use timestamp::Timestamp;
