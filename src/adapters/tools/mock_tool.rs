//! Mock tool adapter for testing.
//!
//! # Features
//!
//! - Scripted outcomes, consumed in order
//! - Simulated latency for timeout and concurrency tests
//! - Call tracking and peak-concurrency tracking for verification
//! - Switchable health status
//!
//! # Example
//!
//! ```ignore
//! let tool = MockToolAdapter::new()
//!     .with_outcome(MockOutcome::Fail("service down".into()))
//!     .with_delay(Duration::from_millis(100));
//!
//! gateway.register(descriptor, Arc::new(tool.clone()))?;
//! assert_eq!(tool.call_count(), 0);
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::foundation::ValidationError;
use crate::domain::invocation::Parameters;
use crate::ports::{AdapterError, HealthStatus, InvocationContext, ToolAdapter};

/// One scripted result.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return this payload.
    Success(Value),
    /// Fail with an execution error.
    Fail(String),
    /// Report the backing service as unreachable.
    Unavailable(String),
    /// Reject the inputs.
    InvalidParameters(ValidationError),
    /// Never finish on its own; only the deadline or cancellation ends it.
    Hang,
}

/// Mock tool adapter.
#[derive(Debug, Clone)]
pub struct MockToolAdapter {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    default_outcome: MockOutcome,
    delay: Duration,
    health: Arc<Mutex<HealthStatus>>,
    health_delay: Duration,
    estimated_cost: Duration,
    calls: Arc<Mutex<Vec<Parameters>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    cancellations: Arc<AtomicUsize>,
}

impl Default for MockToolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockToolAdapter {
    /// Creates a mock that succeeds instantly with `{"ok": true}`.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            default_outcome: MockOutcome::Success(json!({"ok": true})),
            delay: Duration::ZERO,
            health: Arc::new(Mutex::new(HealthStatus::healthy("mock ready"))),
            health_delay: Duration::ZERO,
            estimated_cost: Duration::from_millis(100),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            cancellations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues an outcome.
    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.push_outcome(outcome);
        self
    }

    /// Outcome used once the queue is empty.
    pub fn with_default_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Sets simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets simulated latency of `health_check`.
    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    pub fn with_estimated_cost(mut self, cost: Duration) -> Self {
        self.estimated_cost = cost;
        self
    }

    /// Queues an outcome on an already shared mock.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        lock(&self.outcomes).push_back(outcome);
    }

    pub fn set_health(&self, health: HealthStatus) {
        *lock(&self.health) = health;
    }

    /// Returns the number of calls that reached the tool.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns the parameters of every call.
    pub fn calls(&self) -> Vec<Parameters> {
        lock(&self.calls).clone()
    }

    /// Highest number of simultaneous calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Calls that observed the cancellation signal.
    pub fn cancellation_count(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> MockOutcome {
        lock(&self.outcomes)
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone())
    }

    async fn run(&self, outcome: MockOutcome) -> Result<Value, AdapterError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match outcome {
            MockOutcome::Success(value) => Ok(value),
            MockOutcome::Fail(message) => Err(AdapterError::Execution(message)),
            MockOutcome::Unavailable(message) => Err(AdapterError::Unavailable(message)),
            MockOutcome::InvalidParameters(err) => Err(AdapterError::InvalidParameters(err)),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ToolAdapter for MockToolAdapter {
    async fn invoke(
        &self,
        params: &Parameters,
        ctx: &InvocationContext,
    ) -> Result<Value, AdapterError> {
        lock(&self.calls).push(params.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let outcome = self.next_outcome();
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                self.cancellations.fetch_add(1, Ordering::SeqCst);
                Err(AdapterError::Execution("cancelled".to_string()))
            }
            result = self.run(outcome) => result,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.health_delay.is_zero() {
            tokio::time::sleep(self.health_delay).await;
        }
        lock(&self.health).clone()
    }

    fn estimated_cost(&self, _params: &Parameters) -> Duration {
        self.estimated_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::invocation::CorrelationContext;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> InvocationContext {
        InvocationContext::new(
            CorrelationContext::new(),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn plays_scripted_outcomes_then_default() {
        let tool = MockToolAdapter::new()
            .with_outcome(MockOutcome::Fail("boom".into()))
            .with_outcome(MockOutcome::Success(json!({"hits": 3})));
        let params = Parameters::new();

        assert_eq!(
            tool.invoke(&params, &ctx()).await,
            Err(AdapterError::Execution("boom".into()))
        );
        assert_eq!(tool.invoke(&params, &ctx()).await.unwrap(), json!({"hits": 3}));
        assert_eq!(tool.invoke(&params, &ctx()).await.unwrap(), json!({"ok": true}));
        assert_eq!(tool.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hang_ends_on_cancellation() {
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Hang);
        let ctx = ctx();
        let cancel = ctx.cancel.clone();

        let call = {
            let tool = tool.clone();
            tokio::spawn(async move { tool.invoke(&Parameters::new(), &ctx).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert!(call.await.unwrap().is_err());
        assert_eq!(tool.cancellation_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_peak_concurrency() {
        let tool = MockToolAdapter::new().with_delay(Duration::from_millis(50));
        let calls: Vec<_> = (0..3)
            .map(|_| {
                let tool = tool.clone();
                tokio::spawn(async move { tool.invoke(&Parameters::new(), &ctx()).await })
            })
            .collect();
        for call in calls {
            call.await.unwrap().unwrap();
        }
        assert_eq!(tool.peak_concurrency(), 3);
    }

    #[tokio::test]
    async fn health_can_be_switched() {
        let tool = MockToolAdapter::new();
        assert!(tool.health_check().await.healthy);

        tool.set_health(HealthStatus::unhealthy("maintenance"));
        assert_eq!(tool.health_check().await.detail, "maintenance");
    }
}
