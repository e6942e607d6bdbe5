//! Participant aggregate entity.
//!
//! Participants are created and edited by the surrounding platform; the
//! matching engine only ever flips their availability, and only inside a
//! store transaction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::domain::foundation::{OrganizationId, ParticipantId, Timeslot};

/// A person who can be paired into sessions.
///
/// # Invariants
///
/// - `preferred_timeslots` holds no duplicates; first-occurrence order is kept
/// - Unknown timeslot names in a stored document are dropped, not rejected
/// - A participant with no preferred timeslots is never matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ParticipantId,
    organization_id: OrganizationId,
    #[serde(deserialize_with = "deserialize_timeslots")]
    preferred_timeslots: Vec<Timeslot>,
    is_available: bool,

    #[serde(default)]
    name: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    introduction: String,
}

impl Participant {
    /// Create a new participant. New entrants are available for pairing.
    pub fn new(
        id: ParticipantId,
        organization_id: OrganizationId,
        preferred_timeslots: impl IntoIterator<Item = Timeslot>,
    ) -> Self {
        Self {
            id,
            organization_id,
            preferred_timeslots: dedup_timeslots(preferred_timeslots),
            is_available: true,
            name: String::new(),
            position: String::new(),
            introduction: String::new(),
        }
    }

    /// Reconstitute a participant from persistence.
    pub fn reconstitute(
        id: ParticipantId,
        organization_id: OrganizationId,
        preferred_timeslots: impl IntoIterator<Item = Timeslot>,
        is_available: bool,
    ) -> Self {
        Self {
            is_available,
            ..Self::new(id, organization_id, preferred_timeslots)
        }
    }

    /// Attach profile fields. They are carried along but never affect matching.
    pub fn with_profile(
        mut self,
        name: impl Into<String>,
        position: impl Into<String>,
        introduction: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self.position = position.into();
        self.introduction = introduction.into();
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    /// Preferred timeslots in the order the participant listed them.
    pub fn preferred_timeslots(&self) -> &[Timeslot] {
        &self.preferred_timeslots
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn introduction(&self) -> &str {
        &self.introduction
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// True if the participant listed the given timeslot.
    pub fn prefers(&self, timeslot: Timeslot) -> bool {
        self.preferred_timeslots.contains(&timeslot)
    }

    /// True if the participant can never be placed in a timeslot group.
    pub fn is_unschedulable(&self) -> bool {
        self.preferred_timeslots.is_empty()
    }

    /// Compares preferred timeslots as sets, ignoring order.
    pub fn has_same_timeslots_as(&self, other: &Participant) -> bool {
        let mine: HashSet<Timeslot> = self.preferred_timeslots.iter().copied().collect();
        let theirs: HashSet<Timeslot> = other.preferred_timeslots.iter().copied().collect();
        mine == theirs
    }

    /// True if both participants belong to the same organization.
    pub fn is_colleague_of(&self, other: &Participant) -> bool {
        self.organization_id == other.organization_id
    }

    /// The first timeslot, in this participant's order, that both share.
    pub fn shared_timeslot_with(&self, other: &Participant) -> Option<Timeslot> {
        self.preferred_timeslots
            .iter()
            .copied()
            .find(|slot| other.prefers(*slot))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace preferred timeslots.
    pub fn set_preferred_timeslots(&mut self, timeslots: impl IntoIterator<Item = Timeslot>) {
        self.preferred_timeslots = dedup_timeslots(timeslots);
    }

    /// Flip availability.
    pub fn set_available(&mut self, available: bool) {
        self.is_available = available;
    }
}

fn dedup_timeslots(timeslots: impl IntoIterator<Item = Timeslot>) -> Vec<Timeslot> {
    let mut seen = HashSet::new();
    timeslots.into_iter().filter(|t| seen.insert(*t)).collect()
}

fn deserialize_timeslots<'de, D>(deserializer: D) -> Result<Vec<Timeslot>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let (known, unknown) = Timeslot::parse_known(raw.iter().map(String::as_str));
    for name in unknown {
        warn!(timeslot = %name, "Ignoring unknown timeslot");
    }
    Ok(dedup_timeslots(known))
}
