//! LifecycleReactor - decides which document changes warrant a matching run.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::handlers::matching::{MatchingCoordinator, MatchingError, MatchingOutcome};
use crate::domain::foundation::{EventId, ParticipantId};
use crate::domain::participant::Participant;
use crate::domain::session::Session;
use crate::ports::StoreError;

/// Why a trigger did not lead to a matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The preferred timeslots are the same set as before.
    TimeslotsUnchanged,
    /// The participant is not currently available for pairing.
    ParticipantUnavailable,
    /// The session update was not a transition to completed.
    NotACompletion,
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorOutcome {
    Skipped(SkipReason),
    Matched(MatchingOutcome),
}

/// Reacts to participant and session lifecycle changes.
pub struct LifecycleReactor {
    coordinator: Arc<MatchingCoordinator>,
}

impl LifecycleReactor {
    pub fn new(coordinator: Arc<MatchingCoordinator>) -> Self {
        Self { coordinator }
    }

    /// A new participant always triggers a run.
    ///
    /// The run reads the whole available pool, so the new participant's
    /// document is not needed; only the id of the triggering event is
    /// taken, to link the scheduled sessions back to it.
    pub async fn on_participant_created(
        &self,
        cause: &EventId,
    ) -> Result<ReactorOutcome, MatchingError> {
        debug!(cause = %cause, "Participant created");
        self.matched(cause).await
    }

    /// Runs only when the timeslot set changed and the participant is
    /// available afterwards.
    pub async fn on_participant_updated(
        &self,
        cause: &EventId,
        before: &Participant,
        after: &Participant,
    ) -> Result<ReactorOutcome, MatchingError> {
        if before.has_same_timeslots_as(after) {
            return Ok(self.skip(after.id(), SkipReason::TimeslotsUnchanged));
        }
        if !after.is_available() {
            return Ok(self.skip(after.id(), SkipReason::ParticipantUnavailable));
        }
        self.matched(cause).await
    }

    /// On completion, returns both participants to the pool and runs.
    ///
    /// The release and the run are separate transactions. A participant
    /// who already sits in another active session is left unavailable, so
    /// a duplicate delivery of the same completion changes nothing.
    pub async fn on_session_updated(
        &self,
        cause: &EventId,
        before: &Session,
        after: &Session,
    ) -> Result<ReactorOutcome, MatchingError> {
        if before.is_completed() || !after.is_completed() {
            debug!(session_id = %after.id(), reason = ?SkipReason::NotACompletion, "Skipping matching");
            return Ok(ReactorOutcome::Skipped(SkipReason::NotACompletion));
        }

        let released = self
            .coordinator
            .retry_policy()
            .retry_async_if(|_| self.release(after), StoreError::is_conflict)
            .await
            .map_err(MatchingError::from)?;

        info!(
            session_id = %after.id(),
            released = released.len(),
            "Session completed, participants released"
        );

        self.matched(cause).await
    }

    async fn release(&self, session: &Session) -> Result<Vec<ParticipantId>, StoreError> {
        let mut tx = self.coordinator.store().begin().await?;
        let mut released = Vec::new();

        for participant_id in session.participants().iter() {
            if tx.participant(participant_id).await?.is_none() {
                warn!(
                    session_id = %session.id(),
                    participant_id = %participant_id,
                    "Completed session refers to an unknown participant"
                );
                continue;
            }
            if tx.has_active_session(participant_id, Some(session.id())).await? {
                debug!(
                    session_id = %session.id(),
                    participant_id = %participant_id,
                    "Participant already in another active session"
                );
                continue;
            }
            tx.set_availability(participant_id, true).await?;
            released.push(participant_id.clone());
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn matched(&self, cause: &EventId) -> Result<ReactorOutcome, MatchingError> {
        self.coordinator
            .run_triggered_by(cause)
            .await
            .map(ReactorOutcome::Matched)
    }

    fn skip(&self, participant_id: &ParticipantId, reason: SkipReason) -> ReactorOutcome {
        debug!(participant_id = %participant_id, reason = ?reason, "Skipping matching");
        ReactorOutcome::Skipped(reason)
    }
}
