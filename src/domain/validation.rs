//! Payload validation against an event definition's schema.
//!
//! Validation is pure: the payload is only read. Fields are checked in schema
//! declaration order and the first violation is returned. Fields not named in
//! the schema are carried through untouched.

use serde_json::Value;

use super::definition::EventDefinition;
use super::registry::EventRegistry;
use super::schema::{FieldSpec, FieldType};
use crate::error::ValidationError;

/// Validate `payload` for the event type `name`.
pub fn validate(registry: &EventRegistry, name: &str, payload: &Value) -> Result<(), ValidationError> {
    let definition = registry.require(name)?;
    validate_payload(definition, payload)
}

/// Validate `payload` against an already resolved definition.
pub fn validate_payload(definition: &EventDefinition, payload: &Value) -> Result<(), ValidationError> {
    let Value::Object(fields) = payload else {
        return Err(ValidationError::NotAnObject {
            event: definition.name().to_string(),
        });
    };

    for (field, spec) in definition.payload_schema().iter() {
        match fields.get(field) {
            None | Some(Value::Null) => {
                if spec.is_required() {
                    return Err(ValidationError::MissingField {
                        event: definition.name().to_string(),
                        field: field.to_string(),
                    });
                }
            }
            Some(value) => check_field(definition.name(), field, spec, value)?,
        }
    }

    Ok(())
}

fn check_field(event: &str, field: &str, spec: &FieldSpec, value: &Value) -> Result<(), ValidationError> {
    if !spec.field_type().matches(value) {
        return Err(ValidationError::TypeMismatch {
            event: event.to_string(),
            field: field.to_string(),
            expected: spec.field_type(),
            found: FieldType::name_of(value),
        });
    }

    if spec.field_type() == FieldType::Number {
        // serde_json numbers always fit an f64 (possibly lossy for huge ints)
        let number = value.as_f64().unwrap_or_default();
        let below = spec.min_value().is_some_and(|min| number < min);
        let above = spec.max_value().is_some_and(|max| number > max);
        if below || above {
            return Err(ValidationError::OutOfRange {
                event: event.to_string(),
                field: field.to_string(),
                value: number,
                min: spec.min_value(),
                max: spec.max_value(),
            });
        }
    }

    if let Some(allowed) = spec.allowed() {
        if !allowed.contains(value) {
            return Err(ValidationError::EnumViolation {
                event: event.to_string(),
                field: field.to_string(),
                allowed: allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }

    Ok(())
}
