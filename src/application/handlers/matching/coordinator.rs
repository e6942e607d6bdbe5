//! MatchingCoordinator - runs one matching invocation against the store.
//!
//! One attempt reads the available pool and its shared history, plans the
//! pairings in memory, stages the writes and commits, all in a single
//! transaction. A conflict anywhere in the attempt discards it and the
//! whole attempt (including the planning) is repeated under the retry
//! policy.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::retry::{RetryError, RetryPolicy};
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, ParticipantId, SerializableDomainEvent, Timestamp,
};
use crate::domain::matching::{MatchPlan, MatchPlanner};
use crate::domain::session::{Session, SessionScheduled};
use crate::ports::{EventPublisher, MatchStore, StoreError};

/// Result of a committed matching invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingOutcome {
    /// Sessions created by the winning attempt.
    pub sessions: Vec<Session>,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
    /// Schedulable participants that stayed available.
    pub unmatched: Vec<ParticipantId>,
}

impl MatchingOutcome {
    pub fn created(&self) -> usize {
        self.sessions.len()
    }
}

/// Errors from a matching invocation. Store state is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchingError {
    #[error("Matching gave up after {attempts} conflicting attempts")]
    RetriesExhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MatchingError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            MatchingError::Store(StoreError::Conflict) => ErrorCode::TransactionConflict,
            MatchingError::Store(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<RetryError<StoreError>> for MatchingError {
    fn from(err: RetryError<StoreError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, .. } => MatchingError::RetriesExhausted { attempts },
            RetryError::Aborted { source, .. } => MatchingError::Store(source),
        }
    }
}

impl From<MatchingError> for DomainError {
    fn from(err: MatchingError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}

/// Pairs every available participant it can, atomically.
pub struct MatchingCoordinator {
    store: Arc<dyn MatchStore>,
    publisher: Arc<dyn EventPublisher>,
    retry: RetryPolicy,
}

impl MatchingCoordinator {
    pub fn new(
        store: Arc<dyn MatchStore>,
        publisher: Arc<dyn EventPublisher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            publisher,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run one matching invocation.
    ///
    /// With fewer than two compatible participants this commits an empty
    /// transaction and returns an outcome with no sessions.
    ///
    /// # Errors
    ///
    /// - `RetriesExhausted` if every attempt hit a conflict
    /// - `Store` for any other store failure, without retrying
    pub async fn run(&self) -> Result<MatchingOutcome, MatchingError> {
        self.execute(None).await
    }

    /// Like [`run`](Self::run), but the `session.scheduled` events name
    /// `cause` as their causation id.
    pub async fn run_triggered_by(
        &self,
        cause: &EventId,
    ) -> Result<MatchingOutcome, MatchingError> {
        self.execute(Some(cause)).await
    }

    async fn execute(&self, cause: Option<&EventId>) -> Result<MatchingOutcome, MatchingError> {
        let (plan, attempts) = self
            .retry
            .retry_async_if(
                |attempt| async move { self.attempt().await.map(|plan| (plan, attempt)) },
                StoreError::is_conflict,
            )
            .await
            .map_err(|err| {
                if let RetryError::Exhausted { attempts, .. } = &err {
                    warn!(attempts, "Matching abandoned after repeated conflicts");
                }
                MatchingError::from(err)
            })?;

        info!(
            sessions = plan.sessions.len(),
            unmatched = plan.unmatched.len(),
            attempts,
            "Matching committed"
        );

        self.announce(&plan.sessions, cause).await;

        Ok(MatchingOutcome {
            sessions: plan.sessions,
            attempts,
            unmatched: plan.unmatched,
        })
    }

    async fn attempt(&self) -> Result<MatchPlan, StoreError> {
        let mut tx = self.store.begin().await?;

        let available = tx.available_participants().await?;
        let ids: Vec<ParticipantId> = available.iter().map(|p| p.id().clone()).collect();
        let history = tx.completed_sessions_among(&ids).await?;

        let plan = MatchPlanner::plan(&available, &history, Timestamp::now())
            .map_err(|e| StoreError::corrupt(e.to_string()))?;

        for participant_id in &plan.unschedulable {
            debug!(participant_id = %participant_id, "Available participant has no preferred timeslot");
        }

        for session in &plan.sessions {
            for participant_id in session.participants().iter() {
                tx.set_availability(participant_id, false).await?;
            }
            tx.create_session(session).await?;
        }

        tx.commit().await?;
        Ok(plan)
    }

    async fn announce(&self, sessions: &[Session], cause: Option<&EventId>) {
        for session in sessions {
            let event = SessionScheduled::from_session(session)
                .to_envelope()
                .caused_by(cause);
            if let Err(e) = self.publisher.publish(event).await {
                warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Failed to publish session.scheduled"
                );
            }
        }
    }
}
