//! History Index - who has already met whom among the available pool.

use std::collections::{HashMap, HashSet};

use crate::domain::foundation::ParticipantId;
use crate::domain::participant::Participant;
use crate::domain::session::Session;

/// Symmetric "already paired" relation between available participants.
///
/// Derived per matching run and never cached: the available pool changes
/// between runs, and a session only counts while both of its participants
/// are available again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryIndex {
    partners: HashMap<ParticipantId, HashSet<ParticipantId>>,
}

impl HistoryIndex {
    /// Builds the index in a single pass over `sessions`.
    ///
    /// A session qualifies only if it is completed and both of its
    /// participants are in `available`. Anything else is ignored, so callers
    /// may pass a broader session set than strictly needed.
    pub fn build(available: &[Participant], sessions: &[Session]) -> Self {
        let pool: HashSet<&ParticipantId> = available.iter().map(|p| p.id()).collect();
        let mut partners: HashMap<ParticipantId, HashSet<ParticipantId>> = HashMap::new();

        for session in sessions.iter().filter(|s| s.is_completed()) {
            let pair = session.participants();
            if !(pool.contains(pair.first()) && pool.contains(pair.second())) {
                continue;
            }
            partners
                .entry(pair.first().clone())
                .or_default()
                .insert(pair.second().clone());
            partners
                .entry(pair.second().clone())
                .or_default()
                .insert(pair.first().clone());
        }

        Self { partners }
    }

    /// True if `a` and `b` have a qualifying completed session together.
    pub fn has_met(&self, a: &ParticipantId, b: &ParticipantId) -> bool {
        self.partners.get(a).is_some_and(|set| set.contains(b))
    }

    /// Everyone `id` must not be re-paired with.
    pub fn partners_of(&self, id: &ParticipantId) -> Option<&HashSet<ParticipantId>> {
        self.partners.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}
