//! Session aggregate entity and the factory that schedules new sessions.
//!
//! A session pairs exactly two participants in one timeslot. Sessions are
//! only ever created by the matching engine inside a committed transaction;
//! completion is recorded by the platform afterwards.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, SessionId, Timeslot, Timestamp, ValidationError};

/// Days between the moment a pairing is committed and the session date.
pub const SESSION_LEAD_DAYS: i64 = 7;

/// Two distinct participants. Equality ignores order.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ParticipantId>", into = "Vec<ParticipantId>")]
pub struct ParticipantPair {
    first: ParticipantId,
    second: ParticipantId,
}

impl ParticipantPair {
    /// Creates a pair, rejecting self-pairing.
    pub fn new(first: ParticipantId, second: ParticipantId) -> Result<Self, ValidationError> {
        if first == second {
            return Err(ValidationError::invalid_pair(format!(
                "participant '{}' cannot be paired with themselves",
                first
            )));
        }
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &ParticipantId {
        &self.first
    }

    pub fn second(&self) -> &ParticipantId {
        &self.second
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        &self.first == id || &self.second == id
    }

    /// The member that is not `id`, if `id` is a member.
    pub fn partner_of(&self, id: &ParticipantId) -> Option<&ParticipantId> {
        if &self.first == id {
            Some(&self.second)
        } else if &self.second == id {
            Some(&self.first)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        [&self.first, &self.second].into_iter()
    }
}

impl PartialEq for ParticipantPair {
    fn eq(&self, other: &Self) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

impl TryFrom<Vec<ParticipantId>> for ParticipantPair {
    type Error = ValidationError;

    fn try_from(ids: Vec<ParticipantId>) -> Result<Self, Self::Error> {
        let [first, second]: [ParticipantId; 2] = ids.try_into().map_err(|ids: Vec<_>| {
            ValidationError::invalid_pair(format!(
                "expected exactly 2 participants, got {}",
                ids.len()
            ))
        })?;
        Self::new(first, second)
    }
}

impl From<ParticipantPair> for Vec<ParticipantId> {
    fn from(pair: ParticipantPair) -> Self {
        vec![pair.first, pair.second]
    }
}

/// Session aggregate - a one-on-one meeting between two participants.
///
/// # Invariants
///
/// - `participants` holds two distinct ids
/// - `scheduled_for` is `created_at` + [`SESSION_LEAD_DAYS`]
/// - completion is one-way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    #[serde(rename = "participantIds")]
    participants: ParticipantPair,
    timeslot: Timeslot,
    #[serde(rename = "date")]
    scheduled_for: Timestamp,
    is_completed: bool,
    created_at: Timestamp,
}

impl Session {
    /// Schedule a new session for a committed pairing.
    ///
    /// Pure: the caller supplies the clock.
    pub fn schedule(participants: ParticipantPair, timeslot: Timeslot, now: Timestamp) -> Self {
        Self {
            id: SessionId::new(),
            participants,
            timeslot,
            scheduled_for: now.add_days(SESSION_LEAD_DAYS),
            is_completed: false,
            created_at: now,
        }
    }

    /// Reconstitute a session from persistence (no events).
    pub fn reconstitute(
        id: SessionId,
        participants: ParticipantPair,
        timeslot: Timeslot,
        scheduled_for: Timestamp,
        is_completed: bool,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            participants,
            timeslot,
            scheduled_for,
            is_completed,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn participants(&self) -> &ParticipantPair {
        &self.participants
    }

    pub fn timeslot(&self) -> Timeslot {
        self.timeslot
    }

    pub fn scheduled_for(&self) -> &Timestamp {
        &self.scheduled_for
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// True while the session has not been completed.
    pub fn is_active(&self) -> bool {
        !self.is_completed
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn involves(&self, id: &ParticipantId) -> bool {
        self.participants.contains(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark the session as held. Returns false if it already was.
    pub fn complete(&mut self) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        true
    }
}
