//! Matching Module - Pure domain services that pair available participants.
//!
//! # Components
//!
//! - `HistoryIndex` - Who already met whom among the available pool
//! - `TimeslotGroups` - Available participants grouped per preferred timeslot
//! - `GreedyMatcher` - First-fit pairing, smallest timeslot group first
//! - `MatchPlanner` - Composes the above and schedules a session per pairing
//!
//! Everything here is synchronous and free of I/O: a matching run reads its
//! snapshot inside a store transaction, plans here, then writes the plan back
//! in the same transaction.

mod greedy;
mod history;
mod partition;

pub use greedy::{GreedyMatcher, Pairing};
pub use history::HistoryIndex;
pub use partition::TimeslotGroups;

use std::collections::HashSet;

use crate::domain::foundation::{ParticipantId, Timestamp, ValidationError};
use crate::domain::participant::Participant;
use crate::domain::session::Session;

/// The outcome of planning one matching run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPlan {
    /// Pairings in the order they were chosen.
    pub pairings: Vec<Pairing>,
    /// One new session per pairing, same order.
    pub sessions: Vec<Session>,
    /// Schedulable participants left without a partner, in input order.
    pub unmatched: Vec<ParticipantId>,
    /// Available participants with no preferred timeslot.
    pub unschedulable: Vec<ParticipantId>,
}

impl MatchPlan {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Every participant that the plan takes out of the available pool.
    pub fn paired_participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.pairings.iter().flat_map(|p| [&p.first, &p.second])
    }
}

/// Plans a matching run over a snapshot.
pub struct MatchPlanner;

impl MatchPlanner {
    /// Computes pairings for `available` and schedules a session for each.
    ///
    /// `history` may contain any sessions; only completed sessions between
    /// two available participants affect the result.
    ///
    /// # Errors
    ///
    /// `ValidationError` only if a pairing would put someone with themselves,
    /// which the matcher never produces for well-formed input.
    pub fn plan(
        available: &[Participant],
        history: &[Session],
        now: Timestamp,
    ) -> Result<MatchPlan, ValidationError> {
        let index = HistoryIndex::build(available, history);
        let groups = TimeslotGroups::partition(available);
        let pairings = GreedyMatcher::pair(&groups, &index);

        let sessions = pairings
            .iter()
            .map(|pairing| Ok(Session::schedule(pairing.pair()?, pairing.timeslot, now)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let paired: HashSet<&ParticipantId> =
            pairings.iter().flat_map(|p| [&p.first, &p.second]).collect();
        let unmatched = available
            .iter()
            .filter(|p| p.is_available() && !p.is_unschedulable() && !paired.contains(p.id()))
            .map(|p| p.id().clone())
            .collect();
        let unschedulable = groups.unschedulable().iter().map(|id| (*id).clone()).collect();

        Ok(MatchPlan {
            pairings,
            sessions,
            unmatched,
            unschedulable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OrganizationId, Timeslot};
    use crate::domain::session::ParticipantPair;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn participant(id: &str, org: &str, slots: &[Timeslot]) -> Participant {
        Participant::new(pid(id), OrganizationId::new(org).unwrap(), slots.iter().copied())
    }

    #[test]
    fn plan_schedules_one_session_per_pairing() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast]),
            participant("b", "1", &[Timeslot::Breakfast]),
        ];
        let now = Timestamp::now();
        let plan = MatchPlanner::plan(&people, &[], now).unwrap();

        assert_eq!(plan.sessions.len(), 1);
        let session = &plan.sessions[0];
        assert_eq!(
            session.participants(),
            &ParticipantPair::new(pid("a"), pid("b")).unwrap()
        );
        assert_eq!(session.timeslot(), Timeslot::Breakfast);
        assert_eq!(session.created_at(), &now);
        assert!(plan.unmatched.is_empty());
    }

    #[test]
    fn plan_reports_unmatched_and_unschedulable() {
        let people = vec![
            participant("a", "1", &[Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Lunch]),
            participant("c", "1", &[Timeslot::Lunch]),
            participant("d", "1", &[]),
        ];
        let plan = MatchPlanner::plan(&people, &[], Timestamp::now()).unwrap();

        assert_eq!(plan.sessions.len(), 1);
        assert_eq!(plan.unmatched, vec![pid("c")]);
        assert_eq!(plan.unschedulable, vec![pid("d")]);
    }

    #[test]
    fn empty_pool_plans_nothing() {
        let plan = MatchPlanner::plan(&[], &[], Timestamp::now()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.unmatched.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    fn slots_from_mask(mask: u8) -> Vec<Timeslot> {
        Timeslot::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, slot)| *slot)
            .collect()
    }

    fn pool_strategy() -> impl Strategy<Value = (Vec<Participant>, Vec<Session>)> {
        prop::collection::vec((0u8..3, 0u8..8), 0..24).prop_flat_map(|specs| {
            let people: Vec<Participant> = specs
                .iter()
                .enumerate()
                .map(|(i, (org, mask))| {
                    participant(&format!("p{:02}", i), &org.to_string(), &slots_from_mask(*mask))
                })
                .collect();
            let len = people.len().max(1);
            let history = prop::collection::vec((0..len, 0..len), 0..12);
            (Just(people), history).prop_map(|(people, raw)| {
                let sessions = raw
                    .into_iter()
                    .filter(|(a, b)| a != b && *a < people.len() && *b < people.len())
                    .map(|(a, b)| {
                        let mut s = Session::schedule(
                            ParticipantPair::new(people[a].id().clone(), people[b].id().clone())
                                .unwrap(),
                            Timeslot::Lunch,
                            Timestamp::now(),
                        );
                        s.complete();
                        s
                    })
                    .collect();
                (people, sessions)
            })
        })
    }

    proptest! {
        #[test]
        fn planning_is_deterministic((people, history) in pool_strategy()) {
            let now = Timestamp::now();
            let first = MatchPlanner::plan(&people, &history, now).unwrap();
            let second = MatchPlanner::plan(&people, &history, now).unwrap();
            prop_assert_eq!(first.pairings, second.pairings);
            prop_assert_eq!(first.unmatched, second.unmatched);
        }

        #[test]
        fn pairings_are_disjoint_and_valid((people, history) in pool_strategy()) {
            let plan = MatchPlanner::plan(&people, &history, Timestamp::now()).unwrap();
            let by_id: HashMap<&ParticipantId, &Participant> =
                people.iter().map(|p| (p.id(), p)).collect();
            let index = HistoryIndex::build(&people, &history);

            let mut seen = HashSet::new();
            for pairing in &plan.pairings {
                prop_assert_ne!(&pairing.first, &pairing.second);
                prop_assert!(seen.insert(pairing.first.clone()));
                prop_assert!(seen.insert(pairing.second.clone()));

                let a = by_id[&pairing.first];
                let b = by_id[&pairing.second];
                prop_assert!(a.is_colleague_of(b));
                prop_assert!(a.prefers(pairing.timeslot));
                prop_assert!(b.prefers(pairing.timeslot));
                prop_assert!(!index.has_met(a.id(), b.id()));
            }
        }

        #[test]
        fn every_schedulable_participant_is_paired_or_unmatched((people, history) in pool_strategy()) {
            let plan = MatchPlanner::plan(&people, &history, Timestamp::now()).unwrap();
            let paired: HashSet<&ParticipantId> = plan.paired_participants().collect();
            let schedulable = people.iter().filter(|p| !p.is_unschedulable()).count();
            prop_assert_eq!(paired.len() + plan.unmatched.len(), schedulable);
        }
    }
}
