//! Greedy Pairing - first-fit pairing within timeslot groups.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{HistoryIndex, TimeslotGroups};
use crate::domain::foundation::{ParticipantId, Timeslot};
use crate::domain::participant::Participant;
use crate::domain::session::ParticipantPair;

/// A pair chosen by the matcher, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub first: ParticipantId,
    pub second: ParticipantId,
    pub timeslot: Timeslot,
}

impl Pairing {
    /// The pairing as a validated participant pair.
    ///
    /// The matcher never pairs anyone with themselves, so this only fails on
    /// hand-built pairings.
    pub fn pair(&self) -> Result<ParticipantPair, crate::domain::foundation::ValidationError> {
        ParticipantPair::new(self.first.clone(), self.second.clone())
    }
}

/// Greedy, first-fit pairing.
///
/// Not a maximum matching: it trades optimality for a simple, reproducible
/// policy.
pub struct GreedyMatcher;

impl GreedyMatcher {
    /// Pairs participants group by group.
    ///
    /// # Algorithm
    ///
    /// 1. Visit timeslot groups by ascending size, ties by timeslot order.
    /// 2. Within a group, visit members in list order, skipping anyone
    ///    already matched in this run (in any group).
    /// 3. For each unmatched member, scan forward through the later members
    ///    for the first one who is unmatched, in the same organization and
    ///    not in the member's history. Pair them and stop scanning.
    ///
    /// Members with no candidate stay unmatched until a later run.
    ///
    /// # Determinism
    ///
    /// Output depends only on the group contents, their order and the
    /// history; no hash-map iteration order or clock is involved.
    pub fn pair(groups: &TimeslotGroups<'_>, history: &HistoryIndex) -> Vec<Pairing> {
        let mut matched: HashSet<&ParticipantId> = HashSet::new();
        let mut pairings = Vec::new();

        for (timeslot, members) in Self::visiting_order(groups) {
            for (index, member) in members.iter().enumerate() {
                if matched.contains(member.id()) {
                    continue;
                }

                let partner = members[index + 1..]
                    .iter()
                    .find(|candidate| Self::is_compatible(member, candidate, &matched, history));

                if let Some(partner) = partner {
                    matched.insert(member.id());
                    matched.insert(partner.id());
                    pairings.push(Pairing {
                        first: member.id().clone(),
                        second: partner.id().clone(),
                        timeslot,
                    });
                }
            }
        }

        pairings
    }

    /// Timeslot groups ordered smallest first; ties keep timeslot order.
    pub fn visiting_order<'g, 'a>(
        groups: &'g TimeslotGroups<'a>,
    ) -> Vec<(Timeslot, &'g [&'a Participant])> {
        let mut ordered: Vec<_> = groups.iter().collect();
        // Stable sort keeps the declaration order for equal sizes.
        ordered.sort_by_key(|(_, members)| members.len());
        ordered
    }

    fn is_compatible(
        member: &Participant,
        candidate: &Participant,
        matched: &HashSet<&ParticipantId>,
        history: &HistoryIndex,
    ) -> bool {
        !matched.contains(candidate.id())
            && member.is_colleague_of(candidate)
            && !history.has_met(member.id(), candidate.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OrganizationId, Timestamp};
    use crate::domain::session::Session;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn participant(id: &str, org: &str, slots: &[Timeslot]) -> Participant {
        Participant::new(pid(id), OrganizationId::new(org).unwrap(), slots.iter().copied())
    }

    fn completed(a: &str, b: &str) -> Session {
        let mut s = Session::schedule(
            ParticipantPair::new(pid(a), pid(b)).unwrap(),
            Timeslot::Lunch,
            Timestamp::now(),
        );
        s.complete();
        s
    }

    fn run(people: &[Participant], sessions: &[Session]) -> Vec<(String, String, Timeslot)> {
        let groups = TimeslotGroups::partition(people);
        let history = HistoryIndex::build(people, sessions);
        GreedyMatcher::pair(&groups, &history)
            .into_iter()
            .map(|p| (p.first.to_string(), p.second.to_string(), p.timeslot))
            .collect()
    }

    #[test]
    fn pairs_two_colleagues_sharing_a_timeslot() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast]),
            participant("b", "1", &[Timeslot::Breakfast]),
        ];
        assert_eq!(
            run(&people, &[]),
            vec![("a".into(), "b".into(), Timeslot::Breakfast)]
        );
    }

    #[test]
    fn does_not_pair_across_organizations() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast]),
            participant("b", "2", &[Timeslot::Breakfast]),
        ];
        assert!(run(&people, &[]).is_empty());
    }

    #[test]
    fn does_not_re_pair_people_who_already_met() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast]),
            participant("b", "1", &[Timeslot::Breakfast]),
        ];
        assert!(run(&people, &[completed("a", "b")]).is_empty());
    }

    #[test]
    fn first_fit_leaves_third_participant_unmatched() {
        let people = vec![
            participant("a", "1", &[Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Lunch]),
            participant("c", "1", &[Timeslot::Lunch]),
        ];
        assert_eq!(
            run(&people, &[]),
            vec![("a".into(), "b".into(), Timeslot::Lunch)]
        );
    }

    #[test]
    fn history_skips_to_next_candidate() {
        let people = vec![
            participant("a", "1", &[Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Lunch]),
            participant("c", "1", &[Timeslot::Lunch]),
        ];
        assert_eq!(
            run(&people, &[completed("a", "b")]),
            vec![("a".into(), "c".into(), Timeslot::Lunch)]
        );
    }

    #[test]
    fn scan_never_looks_backwards() {
        // a takes b. c's remaining colleagues all come earlier in the list,
        // and d is in another organization, so c stays unmatched.
        let people = vec![
            participant("a", "1", &[Timeslot::Tea]),
            participant("b", "1", &[Timeslot::Tea]),
            participant("c", "1", &[Timeslot::Tea]),
            participant("d", "2", &[Timeslot::Tea]),
        ];
        let result = run(&people, &[]);
        assert_eq!(result, vec![("a".into(), "b".into(), Timeslot::Tea)]);
    }

    #[test]
    fn smaller_groups_are_matched_first() {
        // Tea has two members, lunch has three. Tea goes first, so b and c
        // pair at tea and a is left alone at lunch.
        let people = vec![
            participant("a", "1", &[Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Lunch, Timeslot::Tea]),
            participant("c", "1", &[Timeslot::Lunch, Timeslot::Tea]),
        ];
        assert_eq!(
            run(&people, &[]),
            vec![("b".into(), "c".into(), Timeslot::Tea)]
        );
    }

    #[test]
    fn equal_sizes_fall_back_to_timeslot_order() {
        let people = vec![
            participant("a", "1", &[Timeslot::Tea, Timeslot::Breakfast]),
            participant("b", "1", &[Timeslot::Tea, Timeslot::Breakfast]),
        ];
        assert_eq!(
            run(&people, &[]),
            vec![("a".into(), "b".into(), Timeslot::Breakfast)]
        );
    }

    #[test]
    fn matched_participants_are_skipped_in_later_groups() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast, Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Breakfast]),
            participant("c", "1", &[Timeslot::Lunch, Timeslot::Tea]),
            participant("d", "1", &[Timeslot::Lunch, Timeslot::Tea]),
            participant("e", "1", &[Timeslot::Lunch]),
        ];
        // breakfast(2): a-b; tea(2): c-d; lunch(4): a,c,d taken, e alone.
        assert_eq!(
            run(&people, &[]),
            vec![
                ("a".into(), "b".into(), Timeslot::Breakfast),
                ("c".into(), "d".into(), Timeslot::Tea),
            ]
        );
    }

    #[test]
    fn zero_or_one_participant_yields_nothing() {
        assert!(run(&[], &[]).is_empty());
        assert!(run(&[participant("a", "1", &[Timeslot::Tea])], &[]).is_empty());
    }

    #[test]
    fn visiting_order_sorts_by_size_then_timeslot() {
        let people = vec![
            participant("a", "1", &[Timeslot::Breakfast, Timeslot::Lunch]),
            participant("b", "1", &[Timeslot::Lunch]),
        ];
        let groups = TimeslotGroups::partition(&people);
        let order: Vec<Timeslot> = GreedyMatcher::visiting_order(&groups)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        assert_eq!(order, vec![Timeslot::Tea, Timeslot::Breakfast, Timeslot::Lunch]);
    }
}
