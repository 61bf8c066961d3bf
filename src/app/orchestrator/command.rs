//! Messages from [`Orchestrator`](super::Orchestrator) handles to the engine task.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::snapshot::{LifecycleState, MetricsSnapshot};
use super::Admission;
use crate::domain::{Event, EventId, SubscriptionId};
use crate::error::{LifecycleError, Result};
use crate::runtime::{HealthReport, HookKind, LifecycleHook, Subscriber};

pub(super) enum Command {
    Start {
        reply: oneshot::Sender<std::result::Result<(), LifecycleError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
    /// A validated event, ready for rate limiting and enqueueing.
    Submit {
        event: Event,
        reply: oneshot::Sender<Admission>,
    },
    /// A payload for a registered event failed validation.
    RecordRejected {
        event: String,
        reason: String,
    },
    CancelEvent {
        id: EventId,
        reply: oneshot::Sender<Result<bool>>,
    },
    Subscribe {
        event: String,
        subscriber: Arc<dyn Subscriber>,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<bool>,
    },
    AddHook {
        kind: HookKind,
        hook: Arc<dyn LifecycleHook>,
        reply: oneshot::Sender<()>,
    },
    Metrics {
        reply: oneshot::Sender<MetricsSnapshot>,
    },
    CheckHealth {
        reply: oneshot::Sender<HealthReport>,
    },
    State {
        reply: oneshot::Sender<LifecycleState>,
    },
}
