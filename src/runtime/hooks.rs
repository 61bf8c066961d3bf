//! Lifecycle hooks run around start, stop and processing errors.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Before the orchestrator is marked running.
    Start,
    /// After the orchestrator has stopped dispatching.
    Stop,
    /// After a subscriber failed to process an event.
    Error,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "on_start",
            Self::Stop => "on_stop",
            Self::Error => "on_error",
        }
    }
}

/// What a hook is being run for.
#[derive(Debug, Clone, PartialEq)]
pub enum HookContext {
    Start,
    Stop,
    Error(ProcessingFailure),
}

/// A subscriber failure, as reported to error hooks and `system_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingFailure {
    pub error_type: String,
    pub message: String,
    pub context: Map<String, Value>,
    pub recoverable: bool,
}

#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn run(&self, context: &HookContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> LifecycleHook for F
where
    F: Fn(&HookContext) -> anyhow::Result<()> + Send + Sync,
{
    async fn run(&self, context: &HookContext) -> anyhow::Result<()> {
        self(context)
    }
}

#[derive(Default)]
pub struct HookSet {
    start: Vec<Arc<dyn LifecycleHook>>,
    stop: Vec<Arc<dyn LifecycleHook>>,
    error: Vec<Arc<dyn LifecycleHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: HookKind, hook: Arc<dyn LifecycleHook>) {
        self.list_mut(kind).push(hook);
    }

    pub fn len(&self, kind: HookKind) -> usize {
        match kind {
            HookKind::Start => self.start.len(),
            HookKind::Stop => self.stop.len(),
            HookKind::Error => self.error.len(),
        }
    }

    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<Arc<dyn LifecycleHook>> {
        match kind {
            HookKind::Start => &mut self.start,
            HookKind::Stop => &mut self.stop,
            HookKind::Error => &mut self.error,
        }
    }

    fn list(&self, kind: HookKind) -> Vec<Arc<dyn LifecycleHook>> {
        match kind {
            HookKind::Start => self.start.clone(),
            HookKind::Stop => self.stop.clone(),
            HookKind::Error => self.error.clone(),
        }
    }

    /// Run every hook of `kind` in registration order. Failures and panics
    /// are logged and counted; they never stop the remaining hooks.
    pub async fn run(&self, kind: HookKind, context: &HookContext) -> usize {
        let mut failures = 0;
        for (index, hook) in self.list(kind).into_iter().enumerate() {
            match AssertUnwindSafe(hook.run(context)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!(hook = kind.as_str(), index, error = %e, "Lifecycle hook failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(hook = kind.as_str(), index, "Lifecycle hook panicked");
                }
            }
        }
        failures
    }
}
