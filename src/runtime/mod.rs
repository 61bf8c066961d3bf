//! Building blocks owned by the orchestrator's dispatch task.

pub mod health;
pub mod hooks;
pub mod limiter;
pub mod metrics;
pub mod operation;
pub mod queue;
pub mod subscriber;

pub use health::{Component, DispatcherStatus, HealthCheck, HealthReport};
pub use hooks::{HookContext, HookKind, HookSet, LifecycleHook, ProcessingFailure};
pub use limiter::{RateLimiter, RateLimiterStats};
pub use metrics::{EventMetrics, EventMetricsSnapshot, MetricsBook};
pub use operation::{Completion, OperationHandle, OperationRegistry, TimedOperation};
pub use queue::{CancelOutcome, EnqueueOutcome, PriorityQueue, QueueStats};
pub use subscriber::{LogSubscriber, NullSubscriber, Subscriber, SubscriberTable};
