//! Per-event-type admission control over one-second windows.
//!
//! Each event type gets `max_per_window` admissions per window, derived from
//! its target frequency. This is a fixed window, not a token bucket: a burst
//! straddling a window boundary can admit up to twice the budget within one
//! second. That tolerance is accepted in exchange for O(1) state per type.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::domain::EventDefinition;

/// Window length for every event type.
pub const WINDOW: Duration = Duration::from_millis(1000);

/// Admission state for one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub active_event_types: usize,
    pub total_rejected: u64,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, RateWindow>,
    rejected: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to admit one event of this type now.
    pub fn try_admit(&mut self, definition: &EventDefinition) -> bool {
        self.try_admit_at(definition, Instant::now())
    }

    /// Try to admit one event of this type at `now`.
    pub fn try_admit_at(&mut self, definition: &EventDefinition, now: Instant) -> bool {
        let max = definition.max_per_window();
        let window = self
            .windows
            .entry(definition.name().to_string())
            .or_insert(RateWindow {
                count: 0,
                window_start: now,
            });

        if now.saturating_duration_since(window.window_start) >= WINDOW {
            window.count = 0;
            window.window_start = now;
        }

        if window.count >= max {
            self.rejected += 1;
            return false;
        }

        window.count += 1;
        true
    }

    pub fn window(&self, name: &str) -> Option<&RateWindow> {
        self.windows.get(name)
    }

    /// Number of distinct event types with a live window.
    pub fn tracked_event_types(&self) -> usize {
        self.windows.len()
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            active_event_types: self.tracked_event_types(),
            total_rejected: self.rejected,
        }
    }

    pub fn reset(&mut self) {
        self.windows.clear();
    }
}
