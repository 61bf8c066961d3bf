//! Event catalogue, payload schemas and the values that flow through the
//! orchestrator.

mod definition;
mod event;
mod health;
mod ids;
mod registry;
mod schema;
mod validation;

pub use definition::{EventDefinition, MAX_PRIORITY, MIN_PRIORITY};
pub use event::{EmitOptions, Event, Payload};
pub use health::{ComponentHealth, HealthStatus};
pub use ids::{EventId, OperationId, SubscriptionId};
pub use registry::{
    EventRegistry, CONFIDENCE_CHANGE, HEALTH_CHECK, PHASE_TRANSITION, RESONANCE_DETECTED, SIGNAL,
    STRENGTH_SHIFT, SYSTEM_ERROR,
};
pub use schema::{FieldSpec, FieldType, PayloadSchema};
pub use validation::{validate, validate_payload};
