use std::time::Duration;

use event_orchestrator::app::{MetricsSnapshot, Orchestrator};
use tokio::time::Instant;

/// Poll metrics until `done` holds. Panics after five seconds.
pub async fn until<F>(orchestrator: &Orchestrator, mut done: F) -> MetricsSnapshot
where
    F: FnMut(&MetricsSnapshot) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = orchestrator.metrics().await.expect("metrics snapshot");
        if done(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "condition not reached, last snapshot: {snapshot:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until the given event type has been processed `count` times.
pub async fn processed(orchestrator: &Orchestrator, event: &str, count: u64) -> MetricsSnapshot {
    until(orchestrator, |m| {
        m.event(event).map_or(0, |e| e.total_processed) >= count
    })
    .await
}
