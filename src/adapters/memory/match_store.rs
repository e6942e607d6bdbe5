//! In-memory match store with optimistic concurrency control.
//!
//! Every participant document carries a version. A transaction remembers the
//! version of each participant it reads or writes; at commit it takes the
//! write lock, checks that none of those versions moved, then applies all
//! staged writes at once. The first committer wins and later committers get
//! [`StoreError::Conflict`].
//!
//! Besides the transactional port, the store exposes the writes the
//! surrounding platform performs directly (creating participants, editing
//! them, completing sessions) plus fault injection for tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ParticipantId, SessionId};
use crate::domain::participant::Participant;
use crate::domain::session::Session;
use crate::ports::{MatchStore, MatchTransaction, StoreError};

#[derive(Debug, Clone)]
struct Versioned<T> {
    value: T,
    version: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    participants: BTreeMap<ParticipantId, Versioned<Participant>>,
    sessions: Vec<Session>,
    commits: u64,
}

impl StoreState {
    fn version_of(&self, id: &ParticipantId) -> Option<u64> {
        self.participants.get(id).map(|doc| doc.version)
    }

    fn put_participant(&mut self, participant: Participant) -> Option<Participant> {
        let id = participant.id().clone();
        match self.participants.get_mut(&id) {
            Some(doc) => {
                doc.version += 1;
                Some(std::mem::replace(&mut doc.value, participant))
            }
            None => {
                self.participants.insert(
                    id,
                    Versioned {
                        value: participant,
                        version: 1,
                    },
                );
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    pending_conflicts: AtomicUsize,
    offline: AtomicBool,
}

impl Faults {
    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store is offline"));
        }
        Ok(())
    }

    fn take_injected_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Shared in-memory store of participants and sessions.
///
/// Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMatchStore {
    state: Arc<RwLock<StoreState>>,
    faults: Arc<Faults>,
}

impl InMemoryMatchStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with participants.
    pub fn with_participants(participants: impl IntoIterator<Item = Participant>) -> Self {
        let mut state = StoreState::default();
        for participant in participants {
            state.put_participant(participant);
        }
        Self {
            state: Arc::new(RwLock::new(state)),
            faults: Arc::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Platform writes (outside the matching engine)
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or overwrite a participant document.
    ///
    /// Returns the previous document, if any.
    pub async fn put_participant(&self, participant: Participant) -> Option<Participant> {
        self.state.write().await.put_participant(participant)
    }

    /// Insert a session document directly, e.g. imported history.
    pub async fn put_session(&self, session: Session) {
        let mut state = self.state.write().await;
        state.sessions.retain(|s| s.id() != session.id());
        state.sessions.push(session);
    }

    /// Mark a session as held.
    ///
    /// Returns the before and after images of the session document.
    pub async fn complete_session(&self, id: &SessionId) -> Result<(Session, Session), StoreError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| StoreError::corrupt(format!("session {} does not exist", id)))?;
        let before = session.clone();
        session.complete();
        Ok((before, session.clone()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.state
            .read()
            .await
            .participants
            .get(id)
            .map(|doc| doc.value.clone())
    }

    /// All participants ordered by id.
    pub async fn participants(&self) -> Vec<Participant> {
        self.state
            .read()
            .await
            .participants
            .values()
            .map(|doc| doc.value.clone())
            .collect()
    }

    /// All sessions in creation order.
    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.sessions.clone()
    }

    /// Sessions not yet completed.
    pub async fn active_sessions(&self) -> Vec<Session> {
        self.state
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Number of successful commits so far.
    pub async fn commit_count(&self) -> u64 {
        self.state.read().await.commits
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fault injection
    // ─────────────────────────────────────────────────────────────────────────

    /// Make the next `count` commits fail with a conflict.
    pub fn inject_conflicts(&self, count: usize) {
        self.faults.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Simulate the store being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.faults.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn begin(&self) -> Result<Box<dyn MatchTransaction>, StoreError> {
        self.faults.check_online()?;
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            faults: Arc::clone(&self.faults),
            observed: HashMap::new(),
            availability: BTreeMap::new(),
            new_sessions: Vec::new(),
        }))
    }
}

/// A transaction against [`InMemoryMatchStore`].
pub struct InMemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    faults: Arc<Faults>,
    /// Participant versions as first seen by this transaction.
    observed: HashMap<ParticipantId, Option<u64>>,
    availability: BTreeMap<ParticipantId, bool>,
    new_sessions: Vec<Session>,
}

impl InMemoryTransaction {
    fn observe(&mut self, id: &ParticipantId, version: Option<u64>) {
        self.observed.entry(id.clone()).or_insert(version);
    }

    fn with_staged(&self, mut participant: Participant) -> Participant {
        if let Some(available) = self.availability.get(participant.id()) {
            participant.set_available(*available);
        }
        participant
    }
}

#[async_trait]
impl MatchTransaction for InMemoryTransaction {
    async fn available_participants(&mut self) -> Result<Vec<Participant>, StoreError> {
        self.faults.check_online()?;
        let snapshot: Vec<(Participant, u64)> = {
            let state = self.state.read().await;
            state
                .participants
                .values()
                .map(|doc| (doc.value.clone(), doc.version))
                .collect()
        };

        let mut available = Vec::new();
        for (participant, version) in snapshot {
            let participant = self.with_staged(participant);
            if participant.is_available() {
                self.observe(participant.id(), Some(version));
                available.push(participant);
            }
        }
        Ok(available)
    }

    async fn completed_sessions_among(
        &mut self,
        participants: &[ParticipantId],
    ) -> Result<Vec<Session>, StoreError> {
        self.faults.check_online()?;
        let pool: HashSet<&ParticipantId> = participants.iter().collect();
        let state = self.state.read().await;
        Ok(state
            .sessions
            .iter()
            .filter(|s| s.is_completed() && s.participants().iter().all(|id| pool.contains(id)))
            .cloned()
            .collect())
    }

    async fn participant(&mut self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        self.faults.check_online()?;
        let (participant, version) = {
            let state = self.state.read().await;
            match state.participants.get(id) {
                Some(doc) => (Some(doc.value.clone()), Some(doc.version)),
                None => (None, None),
            }
        };
        self.observe(id, version);
        Ok(participant.map(|p| self.with_staged(p)))
    }

    async fn has_active_session(
        &mut self,
        id: &ParticipantId,
        excluding: Option<&SessionId>,
    ) -> Result<bool, StoreError> {
        self.faults.check_online()?;
        let (active, version) = {
            let state = self.state.read().await;
            let active = state
                .sessions
                .iter()
                .chain(self.new_sessions.iter())
                .any(|s| s.is_active() && s.involves(id) && Some(s.id()) != excluding);
            (active, state.version_of(id))
        };
        self.observe(id, version);
        Ok(active)
    }

    async fn set_availability(
        &mut self,
        id: &ParticipantId,
        available: bool,
    ) -> Result<(), StoreError> {
        self.faults.check_online()?;
        let version = self.state.read().await.version_of(id);
        if version.is_none() {
            return Err(StoreError::corrupt(format!("participant {} does not exist", id)));
        }
        self.observe(id, version);
        self.availability.insert(id.clone(), available);
        Ok(())
    }

    async fn create_session(&mut self, session: &Session) -> Result<(), StoreError> {
        self.faults.check_online()?;
        self.new_sessions.push(session.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.faults.check_online()?;
        let mut state = self.state.write().await;

        if self.faults.take_injected_conflict() {
            return Err(StoreError::Conflict);
        }

        let stale = self
            .observed
            .iter()
            .any(|(id, seen)| state.version_of(id) != *seen);
        if stale {
            return Err(StoreError::Conflict);
        }

        if let Some(duplicate) = self
            .new_sessions
            .iter()
            .find(|new| state.sessions.iter().any(|s| s.id() == new.id()))
        {
            return Err(StoreError::corrupt(format!(
                "session {} already exists",
                duplicate.id()
            )));
        }

        for (id, available) in &self.availability {
            if let Some(doc) = state.participants.get_mut(id) {
                doc.value.set_available(*available);
                doc.version += 1;
            }
        }
        state.sessions.extend(self.new_sessions.iter().cloned());
        state.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OrganizationId, Timeslot, Timestamp};
    use crate::domain::session::ParticipantPair;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn participant(id: &str) -> Participant {
        Participant::new(pid(id), OrganizationId::new("1").unwrap(), [Timeslot::Lunch])
    }

    fn session(a: &str, b: &str) -> Session {
        Session::schedule(
            ParticipantPair::new(pid(a), pid(b)).unwrap(),
            Timeslot::Lunch,
            Timestamp::now(),
        )
    }

    async fn pair_in(tx: &mut Box<dyn MatchTransaction>, a: &str, b: &str) {
        tx.set_availability(&pid(a), false).await.unwrap();
        tx.set_availability(&pid(b), false).await.unwrap();
        tx.create_session(&session(a, b)).await.unwrap();
    }

    #[tokio::test]
    async fn available_participants_are_ordered_by_id() {
        let store =
            InMemoryMatchStore::with_participants([participant("c"), participant("a"), participant("b")]);
        let mut tx = store.begin().await.unwrap();

        let ids: Vec<String> = tx
            .available_participants()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        let mut tx = store.begin().await.unwrap();
        tx.available_participants().await.unwrap();
        pair_in(&mut tx, "a", "b").await;

        assert!(store.participant(&pid("a")).await.unwrap().is_available());
        assert!(store.sessions().await.is_empty());

        tx.commit().await.unwrap();

        assert!(!store.participant(&pid("a")).await.unwrap().is_available());
        assert_eq!(store.sessions().await.len(), 1);
        assert_eq!(store.commit_count().await, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        {
            let mut tx = store.begin().await.unwrap();
            pair_in(&mut tx, "a", "b").await;
        }
        assert!(store.sessions().await.is_empty());
        assert_eq!(store.commit_count().await, 0);
    }

    #[tokio::test]
    async fn reads_see_own_staged_writes() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        let mut tx = store.begin().await.unwrap();
        tx.set_availability(&pid("a"), false).await.unwrap();

        let available = tx.available_participants().await.unwrap();
        assert_eq!(available.len(), 1);
        assert!(!tx.participant(&pid("a")).await.unwrap().unwrap().is_available());
    }

    #[tokio::test]
    async fn interleaved_transactions_first_committer_wins() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.available_participants().await.unwrap();
        second.available_participants().await.unwrap();

        pair_in(&mut first, "a", "b").await;
        pair_in(&mut second, "a", "b").await;

        first.commit().await.unwrap();
        assert_eq!(second.commit().await, Err(StoreError::Conflict));

        assert_eq!(store.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn disjoint_transactions_both_commit() {
        let store = InMemoryMatchStore::with_participants([
            participant("a"),
            participant("b"),
            participant("c"),
            participant("d"),
        ]);

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.participant(&pid("a")).await.unwrap();
        second.participant(&pid("c")).await.unwrap();
        pair_in(&mut first, "a", "b").await;
        pair_in(&mut second, "c", "d").await;

        second.commit().await.unwrap();
        first.commit().await.unwrap();
        assert_eq!(store.sessions().await.len(), 2);
    }

    #[tokio::test]
    async fn platform_edit_conflicts_with_open_transaction() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        let mut tx = store.begin().await.unwrap();
        tx.available_participants().await.unwrap();

        let mut edited = participant("a");
        edited.set_preferred_timeslots([Timeslot::Tea]);
        store.put_participant(edited).await;

        pair_in(&mut tx, "a", "b").await;
        assert_eq!(tx.commit().await, Err(StoreError::Conflict));
    }

    #[tokio::test]
    async fn completed_sessions_among_requires_both_members() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        let mut ab = session("a", "b");
        ab.complete();
        let mut ac = session("a", "c");
        ac.complete();
        store.put_session(ab.clone()).await;
        store.put_session(ac).await;
        store.put_session(session("b", "a")).await;

        let mut tx = store.begin().await.unwrap();
        let found = tx
            .completed_sessions_among(&[pid("a"), pid("b")])
            .await
            .unwrap();
        assert_eq!(found, vec![ab]);
    }

    #[tokio::test]
    async fn has_active_session_honours_exclusion() {
        let store = InMemoryMatchStore::with_participants([participant("a"), participant("b")]);
        let active = session("a", "b");
        store.put_session(active.clone()).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.has_active_session(&pid("a"), None).await.unwrap());
        assert!(!tx
            .has_active_session(&pid("a"), Some(active.id()))
            .await
            .unwrap());
        assert!(!tx.has_active_session(&pid("z"), None).await.unwrap());
    }

    #[tokio::test]
    async fn complete_session_returns_both_images() {
        let store = InMemoryMatchStore::new();
        let s = session("a", "b");
        store.put_session(s.clone()).await;

        let (before, after) = store.complete_session(s.id()).await.unwrap();
        assert!(!before.is_completed());
        assert!(after.is_completed());
        assert!(store.active_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn setting_availability_of_unknown_participant_fails() {
        let store = InMemoryMatchStore::new();
        let mut tx = store.begin().await.unwrap();
        let result = tx.set_availability(&pid("ghost"), false).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed() {
        let store = InMemoryMatchStore::with_participants([participant("a")]);
        store.inject_conflicts(1);

        let tx = store.begin().await.unwrap();
        assert_eq!(tx.commit().await, Err(StoreError::Conflict));

        let tx = store.begin().await.unwrap();
        assert_eq!(tx.commit().await, Ok(()));
    }

    #[tokio::test]
    async fn offline_store_refuses_transactions() {
        let store = InMemoryMatchStore::new();
        store.set_offline(true);
        assert!(matches!(store.begin().await, Err(StoreError::Unavailable(_))));

        store.set_offline(false);
        assert!(store.begin().await.is_ok());
    }
}
