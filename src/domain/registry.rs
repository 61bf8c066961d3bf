//! The event type catalogue.
//!
//! A registry is assembled once at startup, then frozen behind an `Arc` by the
//! orchestrator. Two event types are always present because the orchestrator
//! publishes them itself: [`SYSTEM_ERROR`] and [`HEALTH_CHECK`].

use std::collections::BTreeMap;
use std::f64::consts::PI;

use super::definition::EventDefinition;
use super::schema::FieldSpec;
use crate::error::{DefinitionError, ValidationError};

pub const SIGNAL: &str = "signal";
pub const CONFIDENCE_CHANGE: &str = "confidence_change";
pub const STRENGTH_SHIFT: &str = "strength_shift";
pub const PHASE_TRANSITION: &str = "phase_transition";
pub const RESONANCE_DETECTED: &str = "resonance_detected";
pub const SYSTEM_ERROR: &str = "system_error";
pub const HEALTH_CHECK: &str = "health_check";

/// Catalogue of event definitions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    definitions: BTreeMap<String, EventDefinition>,
}

impl EventRegistry {
    /// An empty registry. The system event types are added when an
    /// orchestrator is built from it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard trading catalogue.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for definition in [
            signal(),
            confidence_change(),
            strength_shift(),
            phase_transition(),
            resonance_detected(),
            system_error(),
            health_check(),
        ] {
            registry.definitions.insert(definition.name().to_string(), definition);
        }
        registry
    }

    /// Register a definition, rejecting duplicates and malformed metadata.
    pub fn register(&mut self, definition: EventDefinition) -> Result<(), DefinitionError> {
        definition.check()?;
        if self.definitions.contains_key(definition.name()) {
            return Err(DefinitionError::Duplicate(definition.name().to_string()));
        }
        self.definitions
            .insert(definition.name().to_string(), definition);
        Ok(())
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with(mut self, definition: EventDefinition) -> Result<Self, DefinitionError> {
        self.register(definition)?;
        Ok(self)
    }

    /// Add `system_error` and `health_check` if the caller did not define them.
    pub(crate) fn ensure_system_events(&mut self) {
        for definition in [system_error(), health_check()] {
            self.definitions
                .entry(definition.name().to_string())
                .or_insert(definition);
        }
    }

    pub fn get(&self, name: &str) -> Option<&EventDefinition> {
        self.definitions.get(name)
    }

    /// Look up a definition; unknown names are a contract error.
    pub fn require(&self, name: &str) -> Result<&EventDefinition, ValidationError> {
        self.get(name).ok_or_else(|| ValidationError::UnknownEvent {
            event: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventDefinition> {
        self.definitions.values()
    }

    /// Owned copy of every definition, sorted by name.
    pub fn definitions(&self) -> Vec<EventDefinition> {
        self.definitions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn timestamp() -> FieldSpec {
    FieldSpec::number().required()
}

fn phase() -> FieldSpec {
    FieldSpec::number().required().range(-2.0 * PI, 2.0 * PI)
}

fn signal() -> EventDefinition {
    EventDefinition::new(SIGNAL, 8, 10.0)
        .describe("New trading signal produced by a signal generator")
        .field("timestamp", timestamp())
        .field("symbol", FieldSpec::string().required())
        .field("confidence", FieldSpec::number().required().range(0.0, 1.0))
        .field("strength", FieldSpec::number().required().range(0.0, 100.0))
        .field("phase", phase())
        .field("data", FieldSpec::object())
}

fn confidence_change() -> EventDefinition {
    EventDefinition::new(CONFIDENCE_CHANGE, 6, 2.0)
        .describe("Change in aggregate signal confidence")
        .field("timestamp", timestamp())
        .field("old_confidence", FieldSpec::number().required().range(0.0, 1.0))
        .field("new_confidence", FieldSpec::number().required().range(0.0, 1.0))
        .field("reason", FieldSpec::string())
        .cancellable()
}

fn strength_shift() -> EventDefinition {
    EventDefinition::new(STRENGTH_SHIFT, 7, 5.0)
        .describe("Shift in signal strength level")
        .field("timestamp", timestamp())
        .field("delta", FieldSpec::number().required())
        .field("current_level", FieldSpec::number().required().range(0.0, 100.0))
        .field("direction", FieldSpec::string().required().one_of(["up", "down"]))
}

fn phase_transition() -> EventDefinition {
    EventDefinition::new(PHASE_TRANSITION, 5, 1.0)
        .describe("Market cycle phase transition in progress")
        .field("timestamp", timestamp())
        .field("from_phase", phase())
        .field("to_phase", phase())
        .field("transition_speed", FieldSpec::number().required().min(0.0))
        .cancellable()
}

fn resonance_detected() -> EventDefinition {
    EventDefinition::new(RESONANCE_DETECTED, 9, 0.1)
        .describe("Periodic pattern detected in the price series")
        .field("timestamp", timestamp())
        .field("frequency", FieldSpec::number().required().range(100.0, 2000.0))
        .field("amplitude", FieldSpec::number().required().min(0.0))
        .field("source", FieldSpec::string())
}

fn system_error() -> EventDefinition {
    EventDefinition::new(SYSTEM_ERROR, 10, 0.01)
        .describe("Error raised inside the orchestrator or a subscriber")
        .field("timestamp", timestamp())
        .field("error_type", FieldSpec::string().required())
        .field("message", FieldSpec::string().required())
        .field("context", FieldSpec::object())
        .field("recoverable", FieldSpec::boolean().required())
}

fn health_check() -> EventDefinition {
    EventDefinition::new(HEALTH_CHECK, 4, 0.033)
        .describe("Result of a periodic component health probe")
        .field("timestamp", timestamp())
        .field("component", FieldSpec::string().required())
        .field(
            "status",
            FieldSpec::string()
                .required()
                .one_of(["healthy", "degraded", "unhealthy", "unknown"]),
        )
        .field("metrics", FieldSpec::object())
        .cancellable()
}
