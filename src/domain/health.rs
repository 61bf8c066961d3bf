//! Component health records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest probe result for one component. Overwritten on every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentHealth {
    status: HealthStatus,
    metrics: Map<String, Value>,
    checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(status: HealthStatus, metrics: Map<String, Value>) -> Self {
        Self {
            status,
            metrics,
            checked_at: Utc::now(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(HealthStatus::Unknown, Map::new())
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn metrics(&self) -> &Map<String, Value> {
        &self.metrics
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}
