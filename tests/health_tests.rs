//! Periodic and on-demand health checks.

mod harness;
mod support;

use std::time::Duration;

use event_orchestrator::app::Orchestrator;
use event_orchestrator::config::OrchestratorConfig;
use event_orchestrator::domain::{HealthStatus, HEALTH_CHECK, SIGNAL};
use event_orchestrator::runtime::Component;
use harness::recording_subscriber::RecordingSubscriber;
use support::{payload, wait};

fn orchestrator(interval_ms: u64) -> Orchestrator {
    let config = OrchestratorConfig {
        health_check_interval_ms: interval_ms,
        ..Default::default()
    };
    Orchestrator::with_builtin(config).expect("orchestrator")
}

#[tokio::test]
async fn components_are_unknown_before_first_check() {
    let orchestrator = orchestrator(30_000);
    let metrics = orchestrator.metrics().await.unwrap();

    assert!(metrics.system.last_health_check.is_none());
    for component in Component::ALL {
        assert_eq!(
            metrics.component(component.as_str()).unwrap().status(),
            HealthStatus::Unknown
        );
    }
}

#[tokio::test(start_paused = true)]
async fn periodic_check_publishes_health_events() {
    let orchestrator = orchestrator(1_000);
    let recorder = RecordingSubscriber::new();
    orchestrator.subscribe(HEALTH_CHECK, recorder.clone()).await.unwrap();
    orchestrator.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let metrics = wait::processed(&orchestrator, HEALTH_CHECK, 1).await;

    assert!(metrics.system.last_health_check.is_some());
    assert_eq!(
        metrics.component("event_queue").unwrap().status(),
        HealthStatus::Healthy
    );
    assert_eq!(
        metrics.component("dispatcher").unwrap().status(),
        HealthStatus::Healthy
    );

    // health_check is budgeted at one per window, so only the first
    // component of the cycle is published.
    let health = metrics.event(HEALTH_CHECK).unwrap();
    assert_eq!(health.total_emitted, 1);
    assert_eq!(health.total_rate_limited, 3);

    let events = recorder.events();
    assert_eq!(events[0].payload()["component"], "event_queue");
    assert_eq!(events[0].payload()["status"], "healthy");
    assert_eq!(events[0].payload()["metrics"]["capacity"], 10_000);
}

#[tokio::test(start_paused = true)]
async fn checks_repeat_on_the_interval() {
    let orchestrator = orchestrator(1_000);
    orchestrator.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let metrics = wait::processed(&orchestrator, HEALTH_CHECK, 3).await;
    assert_eq!(metrics.event(HEALTH_CHECK).unwrap().total_emitted, 3);
}

#[tokio::test(start_paused = true)]
async fn stop_disarms_the_health_timer() {
    let orchestrator = orchestrator(1_000);
    orchestrator.start().await.unwrap();
    orchestrator.stop().await.unwrap();

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    let metrics = orchestrator.metrics().await.unwrap();
    assert!(metrics.system.last_health_check.is_none());
    assert_eq!(metrics.event(HEALTH_CHECK).unwrap().total_emitted, 0);
}

#[tokio::test]
async fn on_demand_check_reflects_lifecycle() {
    let orchestrator = orchestrator(30_000);

    let report = orchestrator.check_health().await.unwrap();
    assert_eq!(report.checks().len(), 4);
    assert!(!report.is_healthy());
    assert_eq!(
        report.get(Component::Dispatcher).unwrap().health().status(),
        HealthStatus::Unhealthy
    );

    orchestrator.start().await.unwrap();
    let report = orchestrator.check_health().await.unwrap();
    assert!(report.is_healthy());
    assert_eq!(
        report.get(Component::Metrics).unwrap().health().status(),
        HealthStatus::Healthy
    );

    let metrics = orchestrator.metrics().await.unwrap();
    assert!(metrics.system.last_health_check.is_some());
    assert_eq!(
        metrics.component("dispatcher").unwrap().status(),
        HealthStatus::Healthy
    );
}

#[tokio::test]
async fn near_full_queue_is_degraded() {
    let config = OrchestratorConfig {
        queue_capacity: 10,
        ..Default::default()
    };
    let orchestrator = Orchestrator::with_builtin(config).unwrap();
    for _ in 0..10 {
        orchestrator.emit(SIGNAL, payload::signal()).await.unwrap();
    }

    let report = orchestrator.check_health().await.unwrap();
    assert_eq!(
        report.get(Component::Queue).unwrap().health().status(),
        HealthStatus::Degraded
    );
}
