use std::time::Duration;

use thiserror::Error;

use crate::domain::FieldType;

/// Payload contract violations. Always the caller's bug; never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown event '{event}'")]
    UnknownEvent { event: String },

    #[error("payload for '{event}' must be an object")]
    NotAnObject { event: String },

    #[error("field '{field}' is required for event '{event}'")]
    MissingField { event: String, field: String },

    #[error("field '{field}' must be of type '{expected}' for event '{event}', got '{found}'")]
    TypeMismatch {
        event: String,
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{field}' = {value} is outside [{}, {}] for event '{event}'", fmt_bound(.min), fmt_bound(.max))]
    OutOfRange {
        event: String,
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("field '{field}' must be one of [{allowed}] for event '{event}'")]
    EnumViolation {
        event: String,
        field: String,
        allowed: String,
    },
}

fn fmt_bound(bound: &Option<f64>) -> String {
    bound.map_or_else(|| "..".to_string(), |b| b.to_string())
}

/// Errors raised while building an event registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("event name cannot be empty")]
    EmptyName,

    #[error("event '{0}' is already defined")]
    Duplicate(String),

    #[error("priority {priority} for '{event}' must be within 1..=10")]
    InvalidPriority { event: String, priority: u8 },

    #[error("target frequency {frequency_hz} Hz for '{event}' must be finite and positive")]
    InvalidFrequency { event: String, frequency_hz: f64 },
}

/// Outcome of a timed operation that did not resolve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("operation timed out after {}ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Orchestrator lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("orchestrator is already running (state: {state})")]
    AlreadyRunning { state: &'static str },

    #[error("orchestrator core has shut down")]
    Closed,
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("event '{event}' is not cancellable")]
    NotCancellable { event: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
