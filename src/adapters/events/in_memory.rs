//! In-process event bus.
//!
//! Delivers each published envelope to the handlers subscribed to its event
//! type, in subscription order, on the publisher's task. Every envelope is
//! also recorded so callers can inspect what was announced.
//!
//! Handlers may publish from inside `handle` (the matching run triggered by
//! a `session.updated` event announces `session.scheduled`); no lock is held
//! while a handler runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

type HandlerMap = HashMap<String, Vec<Arc<dyn EventHandler>>>;

/// In-process event bus with a publication log.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// MatchingTriggerHandler::new(reactor).subscribe_to(bus.as_ref());
///
/// bus.publish(ParticipantCreated::new(participant).to_envelope()).await?;
/// assert!(bus.has_event("session.scheduled"));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HandlerMap>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    /// Every envelope published so far, oldest first.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.event_type == event_type)
    }

    /// Number of handlers subscribed to `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());

        // A failing handler does not stop the others.
        let mut errors = Vec::new();
        for handler in self.handlers_for(&event.event_type) {
            if let Err(e) = handler.handle(event.clone()).await {
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            )
            .with_detail("event_type", event.event_type));
        }

        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for event_type in event_types {
            handlers
                .entry(event_type.to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "Session", json!({}))
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "boom"))
        }

        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    /// Publishes a follow-up event from inside its handler.
    struct ChainingHandler {
        bus: Arc<InMemoryEventBus>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for ChainingHandler {
        async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.seen.lock().unwrap().push(event.event_type.clone());
            if event.event_type == "session.updated" {
                self.bus
                    .publish(envelope("session.scheduled", &event.aggregate_id))
                    .await?;
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "ChainingHandler"
        }
    }

    #[tokio::test]
    async fn publish_records_event() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("session.scheduled", "s-1")).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("session.scheduled"));
        assert!(!bus.has_event("session.updated"));
    }

    #[tokio::test]
    async fn filters_by_type() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("session.scheduled", "s-1")).await.unwrap();
        bus.publish(envelope("session.updated", "s-2")).await.unwrap();
        bus.publish(envelope("session.scheduled", "s-3")).await.unwrap();

        let scheduled: Vec<String> = bus
            .events_of_type("session.scheduled")
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(scheduled, vec!["s-1".to_string(), "s-3".to_string()]);
    }

    #[tokio::test]
    async fn handlers_only_see_their_event_types() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(
            &["participant.created", "participant.updated"],
            Arc::new(CountingHandler(count.clone())),
        );

        bus.publish(envelope("participant.created", "p-1")).await.unwrap();
        bus.publish(envelope("participant.updated", "p-1")).await.unwrap();
        bus.publish(envelope("session.scheduled", "s-1")).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(bus.handler_count("participant.created"), 1);
        assert_eq!(bus.handler_count("session.scheduled"), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_starve_others() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("session.updated", Arc::new(FailingHandler));
        bus.subscribe("session.updated", Arc::new(CountingHandler(count.clone())));

        let err = bus
            .publish(envelope("session.updated", "s-1"))
            .await
            .unwrap_err();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(err.message.contains("FailingHandler"));
        assert_eq!(err.details.get("event_type").map(String::as_str), Some("session.updated"));
    }

    #[tokio::test]
    async fn handlers_may_publish_reentrantly() {
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = Arc::new(ChainingHandler {
            bus: Arc::clone(&bus),
            seen: Mutex::new(Vec::new()),
        });
        bus.subscribe_all(&["session.updated", "session.scheduled"], handler.clone());

        bus.publish(envelope("session.updated", "s-1")).await.unwrap();

        assert_eq!(
            *handler.seen.lock().unwrap(),
            vec!["session.updated".to_string(), "session.scheduled".to_string()]
        );
        assert_eq!(bus.event_count(), 2);
    }

    #[tokio::test]
    async fn publish_all_delivers_in_order() {
        let bus = InMemoryEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("session.updated", Arc::new(CountingHandler(count.clone())));

        bus.publish_all(vec![
            envelope("session.updated", "s-1"),
            envelope("session.updated", "s-2"),
        ])
        .await
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        let order: Vec<String> = bus
            .published_events()
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(order, vec!["s-1".to_string(), "s-2".to_string()]);
    }
}
