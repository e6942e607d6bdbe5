//! EventSubscriber port - Interface for subscribing to domain events.
//!
//! Trigger handlers register interest in participant and session changes
//! here without knowing how the events are dispatched.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Handler for processing domain events.
///
/// Implementations should be:
/// - **Idempotent** - Safe to call multiple times with same event
/// - **Isolated** - Errors don't affect other handlers
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl EventHandler for MatchingTriggerHandler {
///     async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
///         let payload: ParticipantCreated = event.payload_as()?;
///         // Decide whether to run matching...
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "MatchingTriggerHandler"
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process an event.
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for subscribing to domain events.
///
/// # Example
///
/// ```ignore
/// subscriber.subscribe_all(&["participant.created", "session.updated"], handler);
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Subscribe handler to a specific event type.
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>);

    /// Subscribe handler to multiple event types.
    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>);
}

/// Combined trait for event bus implementations.
pub trait EventBus: super::EventPublisher + EventSubscriber {}

impl<T: super::EventPublisher + EventSubscriber> EventBus for T {}
