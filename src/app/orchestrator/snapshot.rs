//! Read-only views of orchestrator state.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ComponentHealth;
use crate::runtime::{EventMetricsSnapshot, QueueStats, RateLimiterStats};

/// Lifecycle of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub state: LifecycleState,
    pub is_running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_ms: u64,
    pub total_events_processed: u64,
    pub total_errors: u64,
    pub last_health_check: Option<DateTime<Utc>>,
}

/// Everything `metrics()` reports, serializable as one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub events: BTreeMap<String, EventMetricsSnapshot>,
    pub queue: QueueStats,
    pub rate_limiter: RateLimiterStats,
    pub components: BTreeMap<String, ComponentHealth>,
    pub active_operations: usize,
}

impl MetricsSnapshot {
    pub fn event(&self, name: &str) -> Option<&EventMetricsSnapshot> {
        self.events.get(name)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.get(name)
    }
}
