//! Participant trigger events.
//!
//! Emitted by the platform that owns participant documents:
//! - `ParticipantCreated` - A participant document was created
//! - `ParticipantUpdated` - A participant document changed (before and after images)

use serde::{Deserialize, Serialize};

use super::Participant;
use crate::domain::foundation::{domain_event, EventId, ParticipantId, Timestamp};

/// Published when a participant document is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantCreated {
    pub event_id: EventId,
    pub participant_id: ParticipantId,
    pub participant: Participant,
    pub created_at: Timestamp,
}

impl ParticipantCreated {
    pub fn new(participant: Participant) -> Self {
        Self {
            event_id: EventId::new(),
            participant_id: participant.id().clone(),
            participant,
            created_at: Timestamp::now(),
        }
    }
}

domain_event!(
    ParticipantCreated,
    event_type = "participant.created",
    schema_version = 1,
    aggregate_id = participant_id,
    aggregate_type = "Participant",
    occurred_at = created_at,
    event_id = event_id
);

/// Published when a participant document changes.
///
/// Carries both images so handlers can decide whether the change matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantUpdated {
    pub event_id: EventId,
    pub participant_id: ParticipantId,
    pub before: Participant,
    pub after: Participant,
    pub updated_at: Timestamp,
}

impl ParticipantUpdated {
    pub fn new(before: Participant, after: Participant) -> Self {
        Self {
            event_id: EventId::new(),
            participant_id: after.id().clone(),
            before,
            after,
            updated_at: Timestamp::now(),
        }
    }
}

domain_event!(
    ParticipantUpdated,
    event_type = "participant.updated",
    schema_version = 1,
    aggregate_id = participant_id,
    aggregate_type = "Participant",
    occurred_at = updated_at,
    event_id = event_id
);
