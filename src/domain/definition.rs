//! Static event type metadata.

use serde::Serialize;

use super::schema::{FieldSpec, PayloadSchema};
use crate::error::DefinitionError;

/// Highest priority an event type may carry.
pub const MAX_PRIORITY: u8 = 10;
/// Lowest priority an event type may carry.
pub const MIN_PRIORITY: u8 = 1;

/// Immutable description of one event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDefinition {
    name: String,
    description: String,
    payload_schema: PayloadSchema,
    target_frequency_hz: f64,
    priority: u8,
    cancellable: bool,
}

impl EventDefinition {
    /// Start a definition with an empty schema and no description.
    pub fn new(name: impl Into<String>, priority: u8, target_frequency_hz: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            payload_schema: PayloadSchema::new(),
            target_frequency_hz,
            priority,
            cancellable: false,
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.payload_schema = self.payload_schema.field(name, spec);
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: PayloadSchema) -> Self {
        self.payload_schema = schema;
        self
    }

    #[must_use]
    pub fn cancellable(mut self) -> Self {
        self.cancellable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payload_schema(&self) -> &PayloadSchema {
        &self.payload_schema
    }

    pub fn target_frequency_hz(&self) -> f64 {
        self.target_frequency_hz
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    /// Admissions allowed per one-second window: `ceil(frequency)`, at least 1.
    pub fn max_per_window(&self) -> u32 {
        let ceiling = self.target_frequency_hz.ceil();
        if ceiling.is_finite() && ceiling >= 1.0 {
            ceiling.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }

    pub(crate) fn check(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(DefinitionError::InvalidPriority {
                event: self.name.clone(),
                priority: self.priority,
            });
        }
        if !self.target_frequency_hz.is_finite() || self.target_frequency_hz <= 0.0 {
            return Err(DefinitionError::InvalidFrequency {
                event: self.name.clone(),
                frequency_hz: self.target_frequency_hz,
            });
        }
        Ok(())
    }
}
