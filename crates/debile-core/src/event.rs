//! Lifecycle events published by the master.
//!
//! Events are telemetry: a sink that fails to deliver must swallow the
//! failure, never report it back to the state transition that produced it.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    #[display("start")]
    Start,
    #[display("complete")]
    Complete,
    #[display("abort")]
    Abort,
    #[display("create")]
    Create,
}

/// Which kind of entity the event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    #[display("job")]
    Job,
    #[display("slave")]
    Slave,
}

impl std::str::FromStr for EventCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "job" => Ok(EventCategory::Job),
            "slave" => Ok(EventCategory::Slave),
            other => Err(crate::Error::Validation(format!(
                "unknown event category: {}",
                other
            ))),
        }
    }
}

/// A lifecycle event with the public snapshot of the affected entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub action: EventAction,
    pub category: EventCategory,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl Event {
    /// Build an event from any serializable snapshot.
    pub fn new<T: Serialize>(action: EventAction, category: EventCategory, payload: &T) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("unserializable payload: {}", e) })
        });
        Self {
            action,
            category,
            payload,
            emitted_at: Utc::now(),
        }
    }

    /// Attach an extra top-level field to an object payload.
    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(object) = self.payload.as_object_mut() {
            object.insert(key.to_string(), value);
        }
        self
    }

    /// Topic string in the `<category>.<action>` form.
    pub fn topic(&self) -> String {
        format!("{}.{}", self.category, self.action)
    }
}

/// Fire-and-forget destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}
