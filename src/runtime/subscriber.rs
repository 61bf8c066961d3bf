//! Subscriber table: event name to handlers, in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Event, SubscriptionId};

/// Receives dispatched events.
///
/// Handlers run synchronously inside the dispatch step, so they should be
/// quick. An `Err` (or a panic) is recorded as a processing error for the
/// event type and republished as a `system_error` event.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

/// A no-op subscriber.
pub struct NullSubscriber;

impl Subscriber for NullSubscriber {
    fn on_event(&self, _event: &Event) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A subscriber that logs every event via tracing.
pub struct LogSubscriber;

impl Subscriber for LogSubscriber {
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        tracing::info!(
            event = %event.name(),
            event_id = %event.id(),
            priority = event.priority(),
            payload = %serde_json::Value::Object(event.payload().clone()),
            "Event dispatched"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub id: SubscriptionId,
    pub subscriber: Arc<dyn Subscriber>,
}

#[derive(Default)]
pub struct SubscriberTable {
    by_event: HashMap<String, Vec<Registration>>,
    next_id: u64,
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber for `event`. Returns the id and the number of
    /// subscribers now registered for that event.
    pub fn add(&mut self, event: &str, subscriber: Arc<dyn Subscriber>) -> (SubscriptionId, usize) {
        self.next_id += 1;
        let id = SubscriptionId::new(self.next_id);
        let handlers = self.by_event.entry(event.to_string()).or_default();
        handlers.push(Registration { id, subscriber });
        (id, handlers.len())
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.by_event.values_mut() {
            if let Some(index) = handlers.iter().position(|r| r.id == id) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }

    /// Handlers for `event`, cloned so the table can change while they run.
    pub(crate) fn handlers(&self, event: &str) -> Vec<Registration> {
        self.by_event.get(event).cloned().unwrap_or_default()
    }
}
