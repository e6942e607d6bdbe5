//! MatchingTriggerHandler - event handler that feeds document changes to
//! the lifecycle reactor.
//!
//! Matching failures are logged and swallowed: the documents that triggered
//! the run are already written, and the next trigger or a sweep picks up
//! whoever was left waiting. Only undecodable payloads are reported back to
//! the bus.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::reactor::{LifecycleReactor, ReactorOutcome};
use crate::application::handlers::matching::MatchingError;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::domain::participant::{ParticipantCreated, ParticipantUpdated};
use crate::domain::session::SessionUpdated;
use crate::ports::{EventHandler, EventSubscriber};

/// Event types that can lead to a matching run.
pub const TRIGGER_EVENT_TYPES: [&str; 3] =
    ["participant.created", "participant.updated", "session.updated"];

/// Routes trigger events to [`LifecycleReactor`].
pub struct MatchingTriggerHandler {
    reactor: Arc<LifecycleReactor>,
}

impl MatchingTriggerHandler {
    pub fn new(reactor: Arc<LifecycleReactor>) -> Self {
        Self { reactor }
    }

    /// Register for every trigger event type.
    pub fn subscribe_to(self: Arc<Self>, subscriber: &dyn EventSubscriber) {
        subscriber.subscribe_all(&TRIGGER_EVENT_TYPES, self);
    }

    async fn dispatch(&self, event: &EventEnvelope) -> Result<Option<ReactorOutcome>, Dispatch> {
        let outcome = match event.event_type.as_str() {
            "participant.created" => {
                let created: ParticipantCreated = decode(event)?;
                debug!(participant_id = %created.participant.id(), "Decoded participant.created");
                self.reactor.on_participant_created(&event.event_id).await?
            }
            "participant.updated" => {
                let updated: ParticipantUpdated = decode(event)?;
                self.reactor
                    .on_participant_updated(&event.event_id, &updated.before, &updated.after)
                    .await?
            }
            "session.updated" => {
                let updated: SessionUpdated = decode(event)?;
                self.reactor
                    .on_session_updated(&event.event_id, &updated.before, &updated.after)
                    .await?
            }
            _ => return Ok(None),
        };
        Ok(Some(outcome))
    }
}

/// Why dispatching an event did not produce an outcome.
enum Dispatch {
    Malformed(DomainError),
    Failed(MatchingError),
}

impl From<MatchingError> for Dispatch {
    fn from(err: MatchingError) -> Self {
        Dispatch::Failed(err)
    }
}

fn decode<T: DeserializeOwned>(event: &EventEnvelope) -> Result<T, Dispatch> {
    event.payload_as().map_err(|e| {
        Dispatch::Malformed(
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Malformed {} payload: {}", event.event_type, e),
            )
            .with_detail("event_id", event.event_id.as_str()),
        )
    })
}

#[async_trait]
impl EventHandler for MatchingTriggerHandler {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        match self.dispatch(&event).await {
            Ok(Some(ReactorOutcome::Matched(outcome))) => {
                info!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    sessions = outcome.created(),
                    attempts = outcome.attempts,
                    "Matching run finished"
                );
                Ok(())
            }
            Ok(Some(ReactorOutcome::Skipped(reason))) => {
                debug!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    reason = ?reason,
                    "Trigger ignored"
                );
                Ok(())
            }
            Ok(None) => {
                debug!(event_type = %event.event_type, "Not a matching trigger");
                Ok(())
            }
            Err(Dispatch::Failed(err)) => {
                error!(
                    event_type = %event.event_type,
                    aggregate_id = %event.aggregate_id,
                    code = %err.code(),
                    error = %err,
                    "Matching run failed"
                );
                Ok(())
            }
            Err(Dispatch::Malformed(err)) => Err(err),
        }
    }

    fn name(&self) -> &'static str {
        "MatchingTriggerHandler"
    }
}
