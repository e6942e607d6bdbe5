//! Match store port - transactional access to participants and sessions.
//!
//! The store is the only shared mutable state in the system. Every read
//! that feeds a write, and every write, goes through a [`MatchTransaction`].
//!
//! # Design
//!
//! - **Optimistic**: implementations detect write-write conflicts and report
//!   them as [`StoreError::Conflict`]; callers retry the whole unit of work
//! - **All-or-nothing**: writes become visible only on a successful
//!   [`MatchTransaction::commit`]; dropping a transaction discards it
//! - **Validated reads**: a commit fails if any participant the transaction
//!   read or wrote was changed by someone else in the meantime

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ParticipantId, SessionId};
use crate::domain::participant::Participant;
use crate::domain::session::Session;

/// Errors reported by a match store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another transaction committed a conflicting write first.
    #[error("Transaction conflict: a concurrent write touched the same records")]
    Conflict,

    /// The store could not be reached or failed to execute a statement.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data that violates a domain invariant.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        StoreError::Corrupt(message.into())
    }

    /// True for errors that a fresh attempt may not hit again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        let code = match err {
            StoreError::Conflict => ErrorCode::TransactionConflict,
            StoreError::Unavailable(_) | StoreError::Corrupt(_) => ErrorCode::DatabaseError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Opens transactions against the participant and session collections.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Begin a new read/write transaction.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the store cannot be reached
    async fn begin(&self) -> Result<Box<dyn MatchTransaction>, StoreError>;
}

/// One atomic unit of reads and writes.
///
/// Every method may return `Conflict` when the implementation detects a
/// conflict early; `commit` returns it when validation fails at the end.
#[async_trait]
pub trait MatchTransaction: Send {
    /// All participants flagged available, ordered by participant id.
    async fn available_participants(&mut self) -> Result<Vec<Participant>, StoreError>;

    /// Completed sessions whose two participants are both in `participants`.
    async fn completed_sessions_among(
        &mut self,
        participants: &[ParticipantId],
    ) -> Result<Vec<Session>, StoreError>;

    /// Read a single participant.
    async fn participant(&mut self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// True if `id` is in an uncompleted session other than `excluding`.
    async fn has_active_session(
        &mut self,
        id: &ParticipantId,
        excluding: Option<&SessionId>,
    ) -> Result<bool, StoreError>;

    /// Stage an availability change.
    async fn set_availability(
        &mut self,
        id: &ParticipantId,
        available: bool,
    ) -> Result<(), StoreError>;

    /// Stage the creation of a session.
    async fn create_session(&mut self, session: &Session) -> Result<(), StoreError>;

    /// Apply all staged writes atomically.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a record read or written here changed since it was read
    /// - `Unavailable` on infrastructure failure
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
