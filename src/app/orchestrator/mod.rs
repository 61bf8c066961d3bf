//! Event orchestrator.
//!
//! [`Orchestrator`] is a cheap, cloneable handle. Validation runs on the
//! caller's task before anything is sent, so contract errors surface
//! immediately from [`Orchestrator::emit`]. Everything else (rate limiting,
//! queueing, dispatch, health checks, metrics) belongs to one engine task
//! that is the only writer of that state.
//!
//! ```no_run
//! use event_orchestrator::app::Orchestrator;
//! use event_orchestrator::config::OrchestratorConfig;
//! use event_orchestrator::domain::{Event, SIGNAL};
//! use serde_json::json;
//!
//! # async fn demo() -> event_orchestrator::error::Result<()> {
//! let orchestrator = Orchestrator::with_builtin(OrchestratorConfig::default())?;
//! orchestrator
//!     .subscribe(SIGNAL, |event: &Event| -> anyhow::Result<()> {
//!         println!("{}", event.id());
//!         Ok(())
//!     })
//!     .await?;
//! orchestrator.start().await?;
//!
//! let queued = orchestrator
//!     .emit(SIGNAL, json!({
//!         "timestamp": 1_700_000_000_000_i64,
//!         "symbol": "BTC",
//!         "confidence": 0.8,
//!         "strength": 55,
//!         "phase": 1.2,
//!     }))
//!     .await?;
//! assert!(queued);
//! # Ok(())
//! # }
//! ```

mod command;
mod engine;
mod snapshot;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;

use crate::config::OrchestratorConfig;
use crate::domain::{
    validate_payload, EmitOptions, Event, EventDefinition, EventId, EventRegistry, SubscriptionId,
};
use crate::error::{Error, LifecycleError, Result, ValidationError};
use crate::runtime::{
    Completion, HealthReport, HookKind, LifecycleHook, OperationRegistry, Subscriber,
    TimedOperation,
};

use command::Command;
use engine::Engine;

pub use snapshot::{LifecycleState, MetricsSnapshot, SystemMetrics};

/// Commands buffered between handles and the engine task.
const COMMAND_BUFFER: usize = 1024;

/// What happened to a submitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued(EventId),
    /// Over the per-type budget for the current window.
    RateLimited,
    /// Queue full of equal-or-higher priority events.
    Dropped,
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Queued(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::Sender<Command>,
    registry: Arc<EventRegistry>,
    operations: Arc<OperationRegistry>,
    default_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Spawn the engine task. Must be called from within a Tokio runtime.
    ///
    /// `system_error` and `health_check` are added to `registry` when it
    /// does not define them.
    pub fn new(config: OrchestratorConfig, mut registry: EventRegistry) -> Result<Self> {
        config.validate()?;
        registry.ensure_system_events();

        let registry = Arc::new(registry);
        let operations = OperationRegistry::new();
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let default_timeout = config.default_timeout();
        let enable_logging = config.enable_logging;

        let engine = Engine::new(config, Arc::clone(&registry), Arc::clone(&operations));
        if enable_logging {
            tokio::spawn(engine.run(rx));
        } else {
            tokio::spawn(engine.run(rx).with_subscriber(NoSubscriber::default()));
        }

        Ok(Self {
            commands: tx,
            registry,
            operations,
            default_timeout,
        })
    }

    /// An orchestrator over the built-in event catalogue.
    pub fn with_builtin(config: OrchestratorConfig) -> Result<Self> {
        Self::new(config, EventRegistry::builtin())
    }

    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| LifecycleError::Closed)?;
        rx.await.map_err(|_| Error::from(LifecycleError::Closed))
    }

    /// Run start hooks, begin dispatching and arm the health timer.
    pub async fn start(&self) -> Result<()> {
        self.request(|reply| Command::Start { reply }).await??;
        Ok(())
    }

    /// Stop dispatching and cancel every tracked operation. Queued events
    /// are kept. Does nothing when already stopped.
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Stop, discard queued events and terminate the engine task. Every handle
    /// returns [`LifecycleError::Closed`] afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    pub async fn state(&self) -> Result<LifecycleState> {
        self.request(|reply| Command::State { reply }).await
    }

    pub async fn is_running(&self) -> Result<bool> {
        Ok(self.state().await? == LifecycleState::Running)
    }

    /// Validate and submit an event. Returns `Ok(false)` when it was rate
    /// limited or dropped by the full queue. Validation failures are errors and
    /// count against the event type's `total_errors`.
    pub async fn emit(&self, name: &str, payload: Value) -> Result<bool> {
        self.emit_with(name, payload, EmitOptions::new()).await
    }

    pub async fn emit_with(&self, name: &str, payload: Value, options: EmitOptions) -> Result<bool> {
        Ok(self.submit(name, payload, options).await?.is_queued())
    }

    /// Like [`emit_with`](Self::emit_with) but reports why an event was not queued.
    pub async fn submit(&self, name: &str, payload: Value, options: EmitOptions) -> Result<Admission> {
        let definition = self.registry.require(name)?;
        if let Err(err) = validate_payload(definition, &payload) {
            let _ = self
                .commands
                .send(Command::RecordRejected {
                    event: name.to_string(),
                    reason: err.to_string(),
                })
                .await;
            return Err(err.into());
        }
        let Value::Object(payload) = payload else {
            return Err(ValidationError::NotAnObject {
                event: name.to_string(),
            }
            .into());
        };

        let event = Event::new(definition, payload, options);
        self.request(|reply| Command::Submit { event, reply }).await
    }

    /// Mark a queued event cancelled so dispatch skips it.
    ///
    /// Returns `Ok(false)` if the event is no longer queued, and
    /// [`Error::NotCancellable`] if its type does not allow cancellation.
    pub async fn cancel_event(&self, id: EventId) -> Result<bool> {
        self.request(|reply| Command::CancelEvent { id, reply }).await?
    }

    /// Register a subscriber for a registered event type.
    pub async fn subscribe<S>(&self, event: &str, subscriber: S) -> Result<SubscriptionId>
    where
        S: Subscriber + 'static,
    {
        self.subscribe_arc(event, Arc::new(subscriber)).await
    }

    pub async fn subscribe_arc(
        &self,
        event: &str,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriptionId> {
        self.registry.require(event)?;
        let event = event.to_string();
        self.request(|reply| Command::Subscribe {
            event,
            subscriber,
            reply,
        })
        .await
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.request(|reply| Command::Unsubscribe { id, reply }).await
    }

    pub async fn add_hook<H>(&self, kind: HookKind, hook: H) -> Result<()>
    where
        H: LifecycleHook + 'static,
    {
        let hook: Arc<dyn LifecycleHook> = Arc::new(hook);
        self.request(|reply| Command::AddHook { kind, hook, reply })
            .await
    }

    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.request(|reply| Command::Metrics { reply }).await
    }

    /// Run a health cycle now, bounded by the default timeout.
    pub async fn check_health(&self) -> Result<HealthReport> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::CheckHealth { reply })
            .await
            .map_err(|_| LifecycleError::Closed)?;

        let operation = self.operations.spawn(self.default_timeout, async move {
            rx.await.map_err(|_| LifecycleError::Closed)
        });
        Ok(operation.wait().await?)
    }

    /// A tracked operation using the configured default timeout. It is
    /// cancelled when the orchestrator stops.
    pub fn operation<T, F>(&self, executor: F) -> TimedOperation<T>
    where
        F: FnOnce(Completion<T>),
    {
        self.operations.create(self.default_timeout, executor)
    }

    pub fn operation_with_timeout<T, F>(&self, timeout: Option<Duration>, executor: F) -> TimedOperation<T>
    where
        F: FnOnce(Completion<T>),
    {
        self.operations.create(timeout, executor)
    }

    /// Run `work` as a tracked operation with the default timeout.
    pub fn spawn_operation<T, F, E>(&self, work: F) -> TimedOperation<T>
    where
        T: Send + 'static,
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: std::fmt::Display,
    {
        self.operations.spawn(self.default_timeout, work)
    }

    /// Copy of every registered definition, sorted by name.
    pub fn event_definitions(&self) -> Vec<EventDefinition> {
        self.registry.definitions()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }
}
