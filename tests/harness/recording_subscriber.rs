use std::sync::Arc;

use event_orchestrator::domain::Event;
use event_orchestrator::runtime::Subscriber;
use parking_lot::Mutex;

/// Thread-safe event collector for dispatch assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingSubscriber {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.name().to_string())
            .collect()
    }
}

impl Subscriber for RecordingSubscriber {
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Fails every event it receives.
#[derive(Clone, Default)]
pub struct FailingSubscriber {
    calls: Arc<Mutex<usize>>,
}

impl FailingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl Subscriber for FailingSubscriber {
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        *self.calls.lock() += 1;
        anyhow::bail!("cannot handle {}", event.name())
    }
}

/// Panics on every event it receives.
pub struct PanickingSubscriber;

impl Subscriber for PanickingSubscriber {
    fn on_event(&self, _event: &Event) -> anyhow::Result<()> {
        panic!("subscriber bug")
    }
}
