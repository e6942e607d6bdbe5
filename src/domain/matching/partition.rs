//! Timeslot Partitioner - groups available participants by preferred timeslot.

use std::collections::BTreeMap;

use crate::domain::foundation::{ParticipantId, Timeslot};
use crate::domain::participant::Participant;

/// Available participants grouped by each timeslot they listed.
///
/// Every timeslot of the enumeration has a group, possibly empty. A
/// participant appears in one group per preferred timeslot, and each group
/// keeps the order of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeslotGroups<'a> {
    groups: BTreeMap<Timeslot, Vec<&'a Participant>>,
    unschedulable: Vec<&'a ParticipantId>,
}

impl<'a> TimeslotGroups<'a> {
    /// Partitions `participants`, skipping anyone not currently available.
    ///
    /// Participants without any preferred timeslot land in no group and are
    /// listed by [`TimeslotGroups::unschedulable`] instead.
    pub fn partition(participants: &'a [Participant]) -> Self {
        let mut groups: BTreeMap<Timeslot, Vec<&'a Participant>> =
            Timeslot::ALL.iter().map(|slot| (*slot, Vec::new())).collect();
        let mut unschedulable = Vec::new();

        for participant in participants.iter().filter(|p| p.is_available()) {
            if participant.is_unschedulable() {
                unschedulable.push(participant.id());
                continue;
            }
            for slot in participant.preferred_timeslots() {
                groups.entry(*slot).or_default().push(participant);
            }
        }

        Self {
            groups,
            unschedulable,
        }
    }

    /// Members of one timeslot group, in input order.
    pub fn group(&self, timeslot: Timeslot) -> &[&'a Participant] {
        self.groups.get(&timeslot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All groups in timeslot declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Timeslot, &[&'a Participant])> {
        self.groups.iter().map(|(slot, members)| (*slot, members.as_slice()))
    }

    /// Available participants that listed no timeslot at all.
    pub fn unschedulable(&self) -> &[&'a ParticipantId] {
        &self.unschedulable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrganizationId;

    fn participant(id: &str, slots: &[Timeslot]) -> Participant {
        Participant::new(
            ParticipantId::new(id).unwrap(),
            OrganizationId::new("1").unwrap(),
            slots.iter().copied(),
        )
    }

    fn ids(members: &[&Participant]) -> Vec<String> {
        members.iter().map(|p| p.id().to_string()).collect()
    }

    #[test]
    fn empty_input_yields_empty_groups_for_every_timeslot() {
        let groups = TimeslotGroups::partition(&[]);
        assert_eq!(groups.iter().count(), 3);
        assert!(groups.iter().all(|(_, members)| members.is_empty()));
    }

    #[test]
    fn participant_appears_in_each_preferred_group() {
        let people = vec![
            participant("a", &[Timeslot::Breakfast, Timeslot::Tea]),
            participant("b", &[Timeslot::Tea]),
        ];
        let groups = TimeslotGroups::partition(&people);

        assert_eq!(ids(groups.group(Timeslot::Breakfast)), vec!["a"]);
        assert!(groups.group(Timeslot::Lunch).is_empty());
        assert_eq!(ids(groups.group(Timeslot::Tea)), vec!["a", "b"]);
    }

    #[test]
    fn preserves_input_order_within_group() {
        let people = vec![
            participant("c", &[Timeslot::Lunch]),
            participant("a", &[Timeslot::Lunch]),
            participant("b", &[Timeslot::Lunch]),
        ];
        let groups = TimeslotGroups::partition(&people);
        assert_eq!(ids(groups.group(Timeslot::Lunch)), vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_preferences_are_reported_not_grouped() {
        let people = vec![participant("a", &[]), participant("b", &[Timeslot::Tea])];
        let groups = TimeslotGroups::partition(&people);

        assert_eq!(groups.unschedulable().len(), 1);
        assert_eq!(groups.unschedulable()[0].as_str(), "a");
        assert_eq!(ids(groups.group(Timeslot::Tea)), vec!["b"]);
    }

    #[test]
    fn unavailable_participants_are_skipped() {
        let mut busy = participant("a", &[Timeslot::Tea]);
        busy.set_available(false);
        let people = vec![busy, participant("b", &[Timeslot::Tea])];

        let groups = TimeslotGroups::partition(&people);
        assert_eq!(ids(groups.group(Timeslot::Tea)), vec!["b"]);
    }
}
