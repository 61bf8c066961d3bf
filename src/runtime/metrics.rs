//! Per-event-type and system-wide counters.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Processing-time samples kept per event type for the rolling average.
pub const PROCESSING_SAMPLES: usize = 100;

/// Counters for one event type.
#[derive(Debug, Clone, Default)]
pub struct EventMetrics {
    total_emitted: u64,
    total_processed: u64,
    total_errors: u64,
    total_rate_limited: u64,
    total_dropped: u64,
    total_cancelled: u64,
    last_emitted_at: Option<DateTime<Utc>>,
    samples: VecDeque<Duration>,
    sample_sum: Duration,
}

impl EventMetrics {
    pub fn record_emitted(&mut self, at: DateTime<Utc>) {
        self.total_emitted += 1;
        self.last_emitted_at = Some(at);
    }

    pub fn record_processed(&mut self, elapsed: Duration) {
        self.total_processed += 1;
        self.samples.push_back(elapsed);
        self.sample_sum += elapsed;
        while self.samples.len() > PROCESSING_SAMPLES {
            if let Some(oldest) = self.samples.pop_front() {
                self.sample_sum = self.sample_sum.saturating_sub(oldest);
            }
        }
    }

    pub fn record_error(&mut self) {
        self.total_errors += 1;
    }

    pub fn record_rate_limited(&mut self) {
        self.total_rate_limited += 1;
    }

    pub fn record_dropped(&mut self) {
        self.total_dropped += 1;
    }

    pub fn record_cancelled(&mut self) {
        self.total_cancelled += 1;
    }

    /// Mean of the retained samples, zero before the first one.
    pub fn average_processing_time(&self) -> Duration {
        match u32::try_from(self.samples.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.sample_sum / n,
        }
    }

    pub fn snapshot(&self) -> EventMetricsSnapshot {
        EventMetricsSnapshot {
            total_emitted: self.total_emitted,
            total_processed: self.total_processed,
            total_errors: self.total_errors,
            total_rate_limited: self.total_rate_limited,
            total_dropped: self.total_dropped,
            total_cancelled: self.total_cancelled,
            average_processing_time_ms: self.average_processing_time().as_secs_f64() * 1000.0,
            last_emitted_at: self.last_emitted_at,
        }
    }
}

/// Read-only copy of [`EventMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMetricsSnapshot {
    pub total_emitted: u64,
    pub total_processed: u64,
    pub total_errors: u64,
    pub total_rate_limited: u64,
    pub total_dropped: u64,
    pub total_cancelled: u64,
    pub average_processing_time_ms: f64,
    pub last_emitted_at: Option<DateTime<Utc>>,
}

/// Counters for every known event type plus system-wide totals.
#[derive(Debug, Default)]
pub struct MetricsBook {
    events: BTreeMap<String, EventMetrics>,
    total_events_processed: u64,
    total_errors: u64,
}

impl MetricsBook {
    /// Pre-register every event type so snapshots list them from the start.
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            events: names
                .into_iter()
                .map(|name| (name.to_string(), EventMetrics::default()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn event_mut(&mut self, name: &str) -> &mut EventMetrics {
        self.events.entry(name.to_string()).or_default()
    }

    pub fn event(&self, name: &str) -> Option<&EventMetrics> {
        self.events.get(name)
    }

    pub fn record_system_processed(&mut self) {
        self.total_events_processed += 1;
    }

    pub fn record_system_error(&mut self) {
        self.total_errors += 1;
    }

    pub fn total_events_processed(&self) -> u64 {
        self.total_events_processed
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    /// Sum of `total_processed` across event types.
    pub fn processed_across_types(&self) -> u64 {
        self.events.values().map(|m| m.total_processed).sum()
    }

    pub fn snapshot(&self) -> BTreeMap<String, EventMetricsSnapshot> {
        self.events
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect()
    }
}
