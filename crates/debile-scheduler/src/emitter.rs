//! Event sinks.

use debile_core::{Event, EventSink};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Fans events out to any number of in-process subscribers.
///
/// Sending never blocks; slow subscribers lose the oldest events and a send
/// with no subscribers is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    tx: broadcast::Sender<Event>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEmitter {
    fn emit(&self, event: Event) {
        let topic = event.topic();
        if self.tx.send(event).is_err() {
            debug!(%topic, "No event subscribers, dropping event");
        }
    }
}

/// Writes every event as a structured log record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl EventSink for LogEmitter {
    fn emit(&self, event: Event) {
        info!(
            target: "debile::events",
            action = %event.action,
            category = %event.category,
            payload = %event.payload,
            "Lifecycle event"
        );
    }
}

/// Forwards every event to each inner sink.
#[derive(Clone, Default)]
pub struct FanoutEmitter {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEmitter {
    fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use debile_core::{EventAction, EventCategory};
    use serde_json::json;

    fn event() -> Event {
        Event::new(EventAction::Create, EventCategory::Slave, &json!({"name": "leliel"}))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let emitter = BroadcastEmitter::new(8);
        let mut rx = emitter.subscribe();
        emitter.emit(event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.action, EventAction::Create);
        assert_eq!(received.payload["name"], json!("leliel"));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let emitter = BroadcastEmitter::new(1);
        emitter.emit(event());
        emitter.emit(event());
    }

    #[test]
    fn test_fanout_delivers_to_all() {
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());
        let fanout = FanoutEmitter::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(LogEmitter));
        fanout.emit(event());
        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }
}
