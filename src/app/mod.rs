//! Application layer: the orchestrator and its engine task.

pub mod orchestrator;

pub use orchestrator::{Admission, LifecycleState, MetricsSnapshot, Orchestrator, SystemMetrics};
