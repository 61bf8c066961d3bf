//! Cancellable units of asynchronous work with an optional deadline.
//!
//! A [`TimedOperation`] settles exactly once: with the value its work
//! produced, with the work's rejection, with [`OperationError::TimedOut`] once
//! the deadline passes, or with [`OperationError::Cancelled`]. The deadline is
//! armed at construction by a timer task, so a value delivered after it has
//! passed is discarded no matter when the operation is awaited. Cancellation
//! is a [`CancellationToken`], so it is idempotent and propagates to any
//! spawned work. Once cancelled, an operation never reports a value or a
//! rejection.
//!
//! Operations created through an [`OperationRegistry`] stay tracked until
//! they settle, time out or are dropped, so an owner can cancel all
//! outstanding work in one call.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::domain::OperationId;
use crate::error::OperationError;

/// Outcome slot shared by an operation, its [`Completion`] and its timer.
/// The first party to claim it decides how the operation settles.
#[derive(Debug, Clone)]
struct Settlement {
    id: OperationId,
    claimed: Arc<AtomicBool>,
    expired: CancellationToken,
    registry: Option<Arc<OperationRegistry>>,
}

impl Settlement {
    fn new(id: OperationId, registry: Option<Arc<OperationRegistry>>) -> Self {
        Self {
            id,
            claimed: Arc::new(AtomicBool::new(false)),
            expired: CancellationToken::new(),
            registry,
        }
    }

    /// Returns `false` if something else already settled the operation.
    fn claim(&self) -> bool {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(registry) = &self.registry {
            registry.release(self.id);
        }
        true
    }
}

/// Settles a [`TimedOperation`]. Consumed by the first call, and ignored
/// once the operation has timed out or been cancelled.
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T, String>>,
    settlement: Settlement,
}

impl<T> Completion<T> {
    pub fn resolve(self, value: T) {
        if self.settlement.claim() {
            let _ = self.tx.send(Ok(value));
        }
    }

    pub fn reject(self, reason: impl Into<String>) {
        if self.settlement.claim() {
            let _ = self.tx.send(Err(reason.into()));
        }
    }

    /// `true` once the operation has been awaited to completion or dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Cheap cloneable handle used to cancel an operation from elsewhere.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    token: CancellationToken,
    settlement: Settlement,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.settlement.id
    }

    pub fn cancel(&self) {
        self.settlement.claim();
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct TimedOperation<T> {
    rx: oneshot::Receiver<Result<T, String>>,
    token: CancellationToken,
    timeout: Option<Duration>,
    settlement: Settlement,
    _timer: Option<DropGuard>,
}

impl<T> TimedOperation<T> {
    /// Build an operation from an executor that receives the [`Completion`].
    ///
    /// A `timeout` of `None` or zero disables the deadline. The deadline is
    /// measured from construction; arming it needs a Tokio runtime.
    pub fn new<F>(timeout: Option<Duration>, executor: F) -> Self
    where
        F: FnOnce(Completion<T>),
    {
        Self::with_executor(timeout, None, executor)
    }

    /// Run `work` on the Tokio runtime. Cancelling or timing out the
    /// operation aborts the work at its next suspension point.
    pub fn spawn<F, E>(timeout: Option<Duration>, work: F) -> Self
    where
        T: Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        Self::spawned(timeout, None, work)
    }

    fn with_executor<F>(
        timeout: Option<Duration>,
        registry: Option<&Arc<OperationRegistry>>,
        executor: F,
    ) -> Self
    where
        F: FnOnce(Completion<T>),
    {
        let (operation, completion) = Self::pending(timeout, registry);
        executor(completion);
        operation
    }

    fn spawned<F, E>(
        timeout: Option<Duration>,
        registry: Option<&Arc<OperationRegistry>>,
        work: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        let (operation, completion) = Self::pending(timeout, registry);
        let cancelled = operation.token.clone();
        let expired = operation.settlement.expired.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = expired.cancelled() => {}
                result = work => match result {
                    Ok(value) => completion.resolve(value),
                    Err(e) => completion.reject(e.to_string()),
                },
            }
        });
        operation
    }

    fn pending(
        timeout: Option<Duration>,
        registry: Option<&Arc<OperationRegistry>>,
    ) -> (Self, Completion<T>) {
        let id = OperationId::new();
        let token = CancellationToken::new();
        if let Some(registry) = registry {
            registry.track(id, token.clone());
        }

        let settlement = Settlement::new(id, registry.cloned());
        let timeout = timeout.filter(|t| !t.is_zero());
        let timer = timeout.map(|t| arm_deadline(t, &settlement, &token));
        let (tx, rx) = oneshot::channel();

        let completion = Completion {
            tx,
            settlement: settlement.clone(),
        };
        let operation = Self {
            rx,
            token,
            timeout,
            settlement,
            _timer: timer,
        };
        (operation, completion)
    }

    pub fn id(&self) -> OperationId {
        self.settlement.id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn handle(&self) -> OperationHandle {
        OperationHandle {
            token: self.token.clone(),
            settlement: self.settlement.clone(),
        }
    }

    /// Cancel the operation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.settlement.claim();
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the operation to settle.
    pub async fn wait(mut self) -> Result<T, OperationError> {
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(OperationError::Cancelled),
            _ = self.settlement.expired.cancelled() => Err(OperationError::TimedOut {
                timeout: self.timeout.unwrap_or_default(),
            }),
            settled = &mut self.rx => match settled {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(reason)) => Err(OperationError::Rejected(reason)),
                Err(_) => Err(OperationError::Rejected("operation abandoned without settling".to_string())),
            },
        };

        // A cancel that raced with settlement wins.
        if self.token.is_cancelled() && outcome.is_ok() {
            return Err(OperationError::Cancelled);
        }
        outcome
    }
}

impl<T> Drop for TimedOperation<T> {
    fn drop(&mut self) {
        if let Some(registry) = &self.settlement.registry {
            registry.release(self.settlement.id);
        }
    }
}

/// Spawn the deadline timer. It stops early when the operation is cancelled
/// or when the returned guard is dropped with the operation.
fn arm_deadline(timeout: Duration, settlement: &Settlement, token: &CancellationToken) -> DropGuard {
    let deadline = Instant::now() + timeout;
    let settlement = settlement.clone();
    let cancelled = token.clone();
    let stop = CancellationToken::new();
    let stopped = stop.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = stopped.cancelled() => {}
            _ = cancelled.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {
                if settlement.claim() {
                    debug!(
                        operation = %settlement.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Operation timed out"
                    );
                    settlement.expired.cancel();
                }
            }
        }
    });
    stop.drop_guard()
}

/// Tracks outstanding operations so they can be cancelled together.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    active: Mutex<HashMap<OperationId, CancellationToken>>,
}

impl OperationRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a tracked operation from an executor.
    pub fn create<T, F>(self: &Arc<Self>, timeout: Option<Duration>, executor: F) -> TimedOperation<T>
    where
        F: FnOnce(Completion<T>),
    {
        TimedOperation::with_executor(timeout, Some(self), executor)
    }

    /// Create a tracked operation that runs `work` on the runtime.
    pub fn spawn<T, F, E>(self: &Arc<Self>, timeout: Option<Duration>, work: F) -> TimedOperation<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        TimedOperation::spawned(timeout, Some(self), work)
    }

    fn track(&self, id: OperationId, token: CancellationToken) {
        self.active.lock().insert(id, token);
    }

    fn release(&self, id: OperationId) {
        self.active.lock().remove(&id);
    }

    /// Cancel every tracked operation and forget them. Returns how many were
    /// cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.active.lock().drain().collect();
        for (id, token) in &drained {
            debug!(operation = %id, "Cancelling pending operation");
            token.cancel();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_with_value() {
        let op = TimedOperation::new(Some(Duration::from_secs(5)), |done| done.resolve(42));
        assert_eq!(op.wait().await, Ok(42));
    }

    #[tokio::test]
    async fn rejects_with_reason() {
        let op: TimedOperation<()> = TimedOperation::new(None, |done| done.reject("boom"));
        assert_eq!(
            op.wait().await,
            Err(OperationError::Rejected("boom".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_settled() {
        let mut keep = None;
        let op: TimedOperation<u8> =
            TimedOperation::new(Some(Duration::from_millis(250)), |done| keep = Some(done));

        let result = op.wait().await;
        assert_eq!(
            result,
            Err(OperationError::TimedOut {
                timeout: Duration::from_millis(250)
            })
        );
        assert!(keep.unwrap().is_abandoned());
    }

    #[tokio::test]
    async fn zero_timeout_disables_deadline() {
        let op = TimedOperation::new(Some(Duration::ZERO), |done| done.resolve("ok"));
        assert_eq!(op.timeout(), None);
        assert_eq!(op.wait().await, Ok("ok"));
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_suppresses_resolution() {
        let op = TimedOperation::new(None, |done| done.resolve(1));
        op.cancel();
        op.cancel();
        assert!(op.is_cancelled());
        assert_eq!(op.wait().await, Err(OperationError::Cancelled));
    }

    #[tokio::test]
    async fn handle_cancels_pending_spawned_work() {
        let op: TimedOperation<u32> = TimedOperation::spawn(None, async {
            std::future::pending::<()>().await;
            Ok::<_, String>(1)
        });
        let handle = op.handle();
        let waiter = tokio::spawn(op.wait());

        handle.cancel();
        handle.cancel();
        assert_eq!(waiter.await.unwrap(), Err(OperationError::Cancelled));
    }

    #[tokio::test]
    async fn spawned_work_error_is_a_rejection() {
        let op: TimedOperation<u32> =
            TimedOperation::spawn(None, async { Err::<u32, _>("no liquidity") });
        assert_eq!(
            op.wait().await,
            Err(OperationError::Rejected("no liquidity".to_string()))
        );
    }

    #[tokio::test]
    async fn registry_tracks_until_settled_or_dropped() {
        let registry = OperationRegistry::new();
        let mut pending = None;
        let op: TimedOperation<u8> = registry.create(None, |done| pending = Some(done));
        let other: TimedOperation<u8> = registry.create(None, |_done| {});
        assert_eq!(registry.len(), 2);

        pending.take().unwrap().resolve(3);
        assert_eq!(registry.len(), 1);
        assert_eq!(op.wait().await, Ok(3));

        drop(other);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_after_deadline_is_ignored() {
        let mut late = None;
        let op: TimedOperation<u8> =
            TimedOperation::new(Some(Duration::from_millis(50)), |done| late = Some(done));

        tokio::time::sleep(Duration::from_millis(200)).await;
        late.take().unwrap().resolve(7);

        assert_eq!(
            op.wait().await,
            Err(OperationError::TimedOut {
                timeout: Duration::from_millis(50)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_before_deadline_survives_late_wait() {
        let op = TimedOperation::new(Some(Duration::from_millis(50)), |done| done.resolve(5));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(op.wait().await, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn registry_releases_operation_once_deadline_passes() {
        let registry = OperationRegistry::new();
        let mut held = None;
        let op: TimedOperation<u8> =
            registry.create(Some(Duration::from_millis(50)), |done| held = Some(done));
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.is_empty());
        assert_eq!(registry.cancel_all(), 0);

        held.take().unwrap().resolve(1);
        assert!(matches!(op.wait().await, Err(OperationError::TimedOut { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_work_is_abandoned_on_timeout() {
        let op: TimedOperation<u32> = TimedOperation::spawn(Some(Duration::from_millis(100)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(1)
        });
        assert_eq!(
            op.wait().await,
            Err(OperationError::TimedOut {
                timeout: Duration::from_millis(100)
            })
        );
    }

    #[tokio::test]
    async fn registry_cancel_all_cancels_everything() {
        let registry = OperationRegistry::new();
        let mut pending = Vec::new();
        let a: TimedOperation<u8> = registry.create(None, |done| pending.push(done));
        let b: TimedOperation<u8> = registry.create(None, |done| pending.push(done));

        assert_eq!(registry.cancel_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.cancel_all(), 0);

        for done in pending {
            done.resolve(9);
        }
        assert_eq!(a.wait().await, Err(OperationError::Cancelled));
        assert_eq!(b.wait().await, Err(OperationError::Cancelled));
    }
}
