//! Session domain events.
//!
//! - `SessionScheduled` - The matching engine committed a new session
//! - `SessionUpdated` - The platform changed a session document (before and after images)

use serde::{Deserialize, Serialize};

use super::{ParticipantPair, Session};
use crate::domain::foundation::{domain_event, EventId, SessionId, Timeslot, Timestamp};

// ════════════════════════════════════════════════════════════════════════════
// SessionScheduled
// ════════════════════════════════════════════════════════════════════════════

/// Published after a matching transaction commits, once per new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionScheduled {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub participants: ParticipantPair,
    pub timeslot: Timeslot,
    pub scheduled_for: Timestamp,
    pub created_at: Timestamp,
}

impl SessionScheduled {
    pub fn from_session(session: &Session) -> Self {
        Self {
            event_id: EventId::new(),
            session_id: *session.id(),
            participants: session.participants().clone(),
            timeslot: session.timeslot(),
            scheduled_for: *session.scheduled_for(),
            created_at: *session.created_at(),
        }
    }
}

domain_event!(
    SessionScheduled,
    event_type = "session.scheduled",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionUpdated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session document changes, usually on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUpdated {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub before: Session,
    pub after: Session,
    pub updated_at: Timestamp,
}

impl SessionUpdated {
    pub fn new(before: Session, after: Session) -> Self {
        Self {
            event_id: EventId::new(),
            session_id: *after.id(),
            before,
            after,
            updated_at: Timestamp::now(),
        }
    }

    /// True if this update marked the session as held.
    pub fn is_completion(&self) -> bool {
        !self.before.is_completed() && self.after.is_completed()
    }
}

domain_event!(
    SessionUpdated,
    event_type = "session.updated",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = updated_at,
    event_id = event_id
);
