//! The single-writer engine task.
//!
//! One task owns the queue, the rate limiter, the metrics and the subscriber
//! table. Handles talk to it over a channel; the task interleaves their
//! commands with health ticks and dispatch steps, yielding to the scheduler
//! after every dispatched event.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::command::Command;
use super::snapshot::{LifecycleState, MetricsSnapshot, SystemMetrics};
use super::Admission;
use crate::config::OrchestratorConfig;
use crate::domain::{
    validate_payload, ComponentHealth, EmitOptions, Event, EventId, EventRegistry, SubscriptionId,
    HEALTH_CHECK, SYSTEM_ERROR,
};
use crate::error::{Error, LifecycleError, Result};
use crate::runtime::health::{
    probe_dispatcher, probe_metrics, probe_queue, probe_rate_limiter, Component, DispatcherStatus,
    HealthCheck, HealthReport,
};
use crate::runtime::{
    CancelOutcome, EnqueueOutcome, HookContext, HookKind, HookSet, MetricsBook,
    OperationRegistry, PriorityQueue, ProcessingFailure, RateLimiter, SubscriberTable,
};

pub(super) struct Engine {
    config: OrchestratorConfig,
    registry: Arc<EventRegistry>,
    operations: Arc<OperationRegistry>,
    state: LifecycleState,
    queue: PriorityQueue,
    limiter: RateLimiter,
    metrics: MetricsBook,
    subscribers: SubscriberTable,
    hooks: HookSet,
    components: BTreeMap<Component, ComponentHealth>,
    started_at: Option<chrono::DateTime<Utc>>,
    started: Option<Instant>,
    last_health_check: Option<chrono::DateTime<Utc>>,
    health_timer: Option<Interval>,
}

impl Engine {
    pub(super) fn new(
        config: OrchestratorConfig,
        registry: Arc<EventRegistry>,
        operations: Arc<OperationRegistry>,
    ) -> Self {
        let components = Component::ALL
            .iter()
            .map(|component| (*component, ComponentHealth::unknown()))
            .collect();

        Self {
            queue: PriorityQueue::new(config.queue_capacity),
            metrics: MetricsBook::new(registry.names()),
            config,
            registry,
            operations,
            state: LifecycleState::Stopped,
            limiter: RateLimiter::new(),
            subscribers: SubscriberTable::new(),
            hooks: HookSet::new(),
            components,
            started_at: None,
            started: None,
            last_health_check: None,
            health_timer: None,
        }
    }

    /// Serve commands until shutdown or until every handle is dropped.
    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let dispatching = self.state == LifecycleState::Running && !self.queue.is_empty();

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("All orchestrator handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                _ = next_tick(&mut self.health_timer) => {
                    self.run_health_cycle();
                }
                _ = std::future::ready(()), if dispatching => {
                    self.dispatch_next().await;
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start { reply } => {
                let _ = reply.send(self.start().await);
            }
            Command::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
            }
            Command::Submit { event, reply } => {
                let _ = reply.send(self.admit(event));
            }
            Command::RecordRejected { event, reason } => {
                error!(event = %event, error = %reason, "Failed to emit event");
                if self.config.enable_metrics {
                    self.metrics.event_mut(&event).record_error();
                }
            }
            Command::CancelEvent { id, reply } => {
                let _ = reply.send(self.cancel_event(id));
            }
            Command::Subscribe {
                event,
                subscriber,
                reply,
            } => {
                let (id, count) = self.subscribers.add(&event, subscriber);
                if count > self.config.max_listeners {
                    warn!(
                        event = %event,
                        subscribers = count,
                        max_listeners = self.config.max_listeners,
                        "Subscriber count exceeds max_listeners, possible leak"
                    );
                }
                debug!(event = %event, subscription = %id, "Subscriber registered");
                let _ = reply.send(id);
            }
            Command::Unsubscribe { id, reply } => {
                let _ = reply.send(self.subscribers.remove(id));
            }
            Command::AddHook { kind, hook, reply } => {
                self.hooks.add(kind, hook);
                let _ = reply.send(());
            }
            Command::Metrics { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::CheckHealth { reply } => {
                let _ = reply.send(self.run_health_cycle());
            }
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
        }
    }

    async fn start(&mut self) -> std::result::Result<(), LifecycleError> {
        if self.state != LifecycleState::Stopped {
            return Err(LifecycleError::AlreadyRunning {
                state: self.state.as_str(),
            });
        }

        self.state = LifecycleState::Starting;
        self.hooks.run(HookKind::Start, &HookContext::Start).await;

        let now = Instant::now();
        let period = self.config.health_check_interval();
        let mut timer = interval_at(now + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state = LifecycleState::Running;
        self.started_at = Some(Utc::now());
        self.started = Some(now);
        self.health_timer = Some(timer);

        info!(
            event_types = self.registry.len(),
            queue_capacity = self.queue.capacity(),
            health_check_interval_ms = self.config.health_check_interval_ms,
            "Event orchestrator started"
        );
        Ok(())
    }

    async fn stop(&mut self) {
        if self.state == LifecycleState::Stopped {
            return;
        }

        self.state = LifecycleState::Stopping;
        let cancelled = self.operations.cancel_all();
        self.health_timer = None;
        self.hooks.run(HookKind::Stop, &HookContext::Stop).await;
        self.state = LifecycleState::Stopped;
        self.started = None;

        info!(
            cancelled_operations = cancelled,
            queued = self.queue.len(),
            "Event orchestrator stopped"
        );
    }

    async fn shutdown(&mut self) {
        self.stop().await;
        let cleared = self.queue.clear();
        self.limiter.reset();
        info!(cleared_events = cleared, "Event orchestrator shut down");
    }

    /// Rate-check and enqueue a validated event.
    fn admit(&mut self, event: Event) -> Admission {
        let name = event.name().to_string();
        let Some(definition) = self.registry.get(&name) else {
            warn!(event = %name, "Unregistered event reached the engine");
            return Admission::Dropped;
        };

        if !self.limiter.try_admit(definition) {
            debug!(event = %name, "Event rate limited");
            if self.config.enable_metrics {
                self.metrics.event_mut(&name).record_rate_limited();
            }
            return Admission::RateLimited;
        }

        let id = event.id();
        let emitted_at = event.enqueued_at();
        match self.queue.offer(event) {
            EnqueueOutcome::Inserted => {}
            EnqueueOutcome::Evicted(victim) => {
                if self.config.enable_metrics {
                    self.metrics.event_mut(victim.name()).record_dropped();
                }
            }
            EnqueueOutcome::Dropped => {
                if self.config.enable_metrics {
                    self.metrics.event_mut(&name).record_dropped();
                }
                return Admission::Dropped;
            }
        }

        if self.config.enable_metrics {
            self.metrics.event_mut(&name).record_emitted(emitted_at);
        }
        Admission::Queued(id)
    }

    /// Emit an event produced by the orchestrator itself.
    fn emit_internal(&mut self, name: &str, payload: Value) {
        let event = match self.registry.require(name) {
            Ok(definition) => {
                if let Err(e) = validate_payload(definition, &payload) {
                    error!(event = name, error = %e, "Internal event failed validation");
                    return;
                }
                let Value::Object(payload) = payload else {
                    return;
                };
                Event::new(definition, payload, EmitOptions::new())
            }
            Err(e) => {
                error!(event = name, error = %e, "Internal event is not registered");
                return;
            }
        };

        let admission = self.admit(event);
        if !admission.is_queued() {
            debug!(event = name, admission = ?admission, "Internal event not queued");
        }
    }

    fn cancel_event(&mut self, id: EventId) -> Result<bool> {
        let Some(name) = self
            .queue
            .iter()
            .find(|event| event.id() == id)
            .map(|event| event.name().to_string())
        else {
            return Ok(false);
        };

        match self.queue.cancel(id) {
            CancelOutcome::Cancelled => {
                debug!(event = %name, event_id = %id, "Queued event cancelled");
                Ok(true)
            }
            CancelOutcome::NotCancellable => Err(Error::NotCancellable { event: name }),
            CancelOutcome::NotFound => Ok(false),
        }
    }

    /// Dispatch the head of the queue to its subscribers.
    async fn dispatch_next(&mut self) {
        let Some(event) = self.queue.dequeue() else {
            return;
        };

        if event.is_cancelled() {
            debug!(event = %event.name(), event_id = %event.id(), "Skipping cancelled event");
            if self.config.enable_metrics {
                self.metrics.event_mut(event.name()).record_cancelled();
            }
            return;
        }

        let started = std::time::Instant::now();
        let mut failures = Vec::new();
        for registration in self.subscribers.handlers(event.name()) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                registration.subscriber.on_event(&event)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push((registration.id, "subscriber_error", format!("{e:#}"))),
                Err(payload) => {
                    failures.push((registration.id, "subscriber_panic", panic_message(payload.as_ref())))
                }
            }
        }
        let elapsed = started.elapsed();

        if failures.is_empty() {
            self.metrics.record_system_processed();
            if self.config.enable_metrics {
                self.metrics.event_mut(event.name()).record_processed(elapsed);
            }
            return;
        }

        for (subscription, error_type, message) in failures {
            self.report_failure(&event, subscription, error_type, message)
                .await;
        }
    }

    async fn report_failure(
        &mut self,
        event: &Event,
        subscription: SubscriptionId,
        error_type: &str,
        message: String,
    ) {
        error!(
            event = %event.name(),
            event_id = %event.id(),
            subscription = %subscription,
            error = %message,
            "Subscriber failed to process event"
        );

        self.metrics.record_system_error();
        if self.config.enable_metrics {
            self.metrics.event_mut(event.name()).record_error();
        }

        let mut context = Map::new();
        context.insert("event_id".into(), json!(event.id().to_string()));
        context.insert("event_name".into(), json!(event.name()));
        context.insert("subscription".into(), json!(subscription.to_string()));

        let failure = ProcessingFailure {
            error_type: error_type.to_string(),
            message,
            context,
            recoverable: true,
        };
        self.hooks
            .run(HookKind::Error, &HookContext::Error(failure.clone()))
            .await;

        self.emit_internal(
            SYSTEM_ERROR,
            json!({
                "timestamp": Utc::now().timestamp_millis(),
                "error_type": failure.error_type,
                "message": failure.message,
                "context": failure.context,
                "recoverable": failure.recoverable,
            }),
        );
    }

    fn probe(&self, component: Component) -> ComponentHealth {
        match component {
            Component::Queue => probe_queue(&self.queue.stats()),
            Component::RateLimiter => probe_rate_limiter(&self.limiter.stats()),
            Component::Metrics => probe_metrics(self.metrics.processed_across_types()),
            Component::Dispatcher => probe_dispatcher(&DispatcherStatus {
                running: self.state == LifecycleState::Running,
                uptime: self.uptime(),
                total_processed: self.metrics.total_events_processed(),
                total_errors: self.metrics.total_errors(),
            }),
        }
    }

    /// Probe every component, store the results and publish them as
    /// `health_check` events.
    fn run_health_cycle(&mut self) -> HealthReport {
        let checks: Vec<HealthCheck> = Component::ALL
            .iter()
            .map(|component| HealthCheck::new(*component, self.probe(*component)))
            .collect();

        let now = Utc::now();
        for check in &checks {
            self.components
                .insert(check.component(), check.health().clone());
            self.emit_internal(
                HEALTH_CHECK,
                json!({
                    "timestamp": now.timestamp_millis(),
                    "component": check.component().as_str(),
                    "status": check.health().status().as_str(),
                    "metrics": check.health().metrics(),
                }),
            );
        }
        self.last_health_check = Some(now);

        let report = HealthReport::new(checks);
        debug!(healthy = report.is_healthy(), "Health check completed");
        report
    }

    fn uptime(&self) -> std::time::Duration {
        self.started.map_or(std::time::Duration::ZERO, |at| at.elapsed())
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            system: SystemMetrics {
                state: self.state,
                is_running: self.state == LifecycleState::Running,
                started_at: self.started_at,
                uptime_ms: u64::try_from(self.uptime().as_millis()).unwrap_or(u64::MAX),
                total_events_processed: self.metrics.total_events_processed(),
                total_errors: self.metrics.total_errors(),
                last_health_check: self.last_health_check,
            },
            events: self.metrics.snapshot(),
            queue: self.queue.stats(),
            rate_limiter: self.limiter.stats(),
            components: self
                .components
                .iter()
                .map(|(component, health)| (component.as_str().to_string(), health.clone()))
                .collect(),
            active_operations: self.operations.len(),
        }
    }
}

/// Completes on the next health tick, or never when the timer is off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "subscriber panicked".to_string()
    }
}
