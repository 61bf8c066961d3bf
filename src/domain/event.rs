//! Emitted events as they travel through the queue to subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::definition::EventDefinition;
use super::ids::EventId;

/// A validated payload record.
pub type Payload = Map<String, Value>;

/// Caller-supplied metadata carried alongside the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitOptions {
    metadata: Map<String, Value>,
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

/// One admitted emission, owned by the queue until it is dispatched or evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    id: EventId,
    name: String,
    payload: Payload,
    priority: u8,
    cancellable: bool,
    cancelled: bool,
    enqueued_at: DateTime<Utc>,
    options: EmitOptions,
}

impl Event {
    /// Build an event from its definition; priority and cancellability are
    /// copied so later registry lookups are unnecessary.
    pub fn new(definition: &EventDefinition, payload: Payload, options: EmitOptions) -> Self {
        Self {
            id: EventId::new(),
            name: definition.name().to_string(),
            payload,
            priority: definition.priority(),
            cancellable: definition.is_cancellable(),
            cancelled: false,
            enqueued_at: Utc::now(),
            options,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Mark the event cancelled. Returns `false` (and changes nothing) when
    /// the event type is not cancellable.
    pub fn cancel(&mut self) -> bool {
        if self.cancellable {
            self.cancelled = true;
        }
        self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_copies_definition_metadata() {
        let def = EventDefinition::new("tick", 6, 1.0).cancellable();
        let event = Event::new(&def, Payload::new(), EmitOptions::new());

        assert_eq!(event.name(), "tick");
        assert_eq!(event.priority(), 6);
        assert!(event.is_cancellable());
        assert!(!event.is_cancelled());
    }

    #[test]
    fn cancel_respects_cancellable_flag() {
        let fixed = EventDefinition::new("fixed", 6, 1.0);
        let mut event = Event::new(&fixed, Payload::new(), EmitOptions::new());
        assert!(!event.cancel());
        assert!(!event.is_cancelled());

        let soft = EventDefinition::new("soft", 6, 1.0).cancellable();
        let mut event = Event::new(&soft, Payload::new(), EmitOptions::new());
        assert!(event.cancel());
        assert!(event.cancel());
        assert!(event.is_cancelled());
    }

    #[test]
    fn emit_options_carry_metadata() {
        let options = EmitOptions::new().with("source", "ema-cross").with("attempt", 2);
        assert_eq!(options.get("source"), Some(&Value::from("ema-cross")));
        assert_eq!(options.metadata().len(), 2);
    }
}
