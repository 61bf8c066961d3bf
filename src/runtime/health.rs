//! Health probes for the orchestrator's components.
//!
//! Each probe is a stateless classifier over live numbers; nothing here keeps
//! history. The orchestrator stores the latest result per component and
//! republishes it as a `health_check` event.

use std::fmt;
use std::time::Duration;

use serde_json::{json, Map, Value};

use super::limiter::RateLimiterStats;
use super::queue::QueueStats;
use crate::domain::{ComponentHealth, HealthStatus};

/// Queue utilization above which the queue is degraded.
pub const QUEUE_DEGRADED_UTILIZATION: f64 = 90.0;
/// Distinct rate-limited event types above which the limiter is degraded.
pub const RATE_LIMITER_MAX_TRACKED: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Queue,
    RateLimiter,
    Metrics,
    Dispatcher,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Queue,
        Component::RateLimiter,
        Component::Metrics,
        Component::Dispatcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queue => "event_queue",
            Self::RateLimiter => "rate_limiter",
            Self::Metrics => "metrics",
            Self::Dispatcher => "dispatcher",
        }
    }

    /// Whether an unhealthy result makes the whole orchestrator unhealthy.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Queue | Self::Dispatcher)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch loop figures fed to [`probe_dispatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatcherStatus {
    pub running: bool,
    pub uptime: Duration,
    pub total_processed: u64,
    pub total_errors: u64,
}

fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn probe_queue(stats: &QueueStats) -> ComponentHealth {
    let status = if stats.utilization_percent > QUEUE_DEGRADED_UTILIZATION {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };
    let metrics = serde_json::to_value(stats).map(to_map).unwrap_or_default();
    ComponentHealth::new(status, metrics)
}

pub fn probe_rate_limiter(stats: &RateLimiterStats) -> ComponentHealth {
    let status = if stats.active_event_types > RATE_LIMITER_MAX_TRACKED {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };
    ComponentHealth::new(
        status,
        to_map(json!({
            "active_rate_limiters": stats.active_event_types,
            "total_rejected": stats.total_rejected,
        })),
    )
}

pub fn probe_metrics(total_processed: u64) -> ComponentHealth {
    ComponentHealth::new(
        HealthStatus::Healthy,
        to_map(json!({ "total_events_processed": total_processed })),
    )
}

pub fn probe_dispatcher(status: &DispatcherStatus) -> ComponentHealth {
    let health = if status.running {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };
    ComponentHealth::new(
        health,
        to_map(json!({
            "uptime_ms": u64::try_from(status.uptime.as_millis()).unwrap_or(u64::MAX),
            "total_processed": status.total_processed,
            "total_errors": status.total_errors,
        })),
    )
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    component: Component,
    health: ComponentHealth,
}

impl HealthCheck {
    pub fn new(component: Component, health: ComponentHealth) -> Self {
        Self { component, health }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn health(&self) -> &ComponentHealth {
        &self.health
    }

    pub fn critical(&self) -> bool {
        self.component.is_critical()
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }
}

/// Result of one health cycle.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        Self { checks }
    }

    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    pub fn get(&self, component: Component) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.component() == component)
    }

    /// Healthy when no critical component is unhealthy. A degraded queue
    /// still counts as serving.
    pub fn is_healthy(&self) -> bool {
        self.checks
            .iter()
            .filter(|check| check.critical())
            .all(|check| check.health().status() != HealthStatus::Unhealthy)
    }
}
