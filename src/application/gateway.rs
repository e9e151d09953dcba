//! ToolGateway - the single entry point for tool invocation.
//!
//! The gateway owns one breaker per registered tool and shares one capacity
//! limiter across all of them. Every invocation that resolves to a registered
//! tool produces exactly one `invocation_started` and one terminal audit
//! event, whichever way it ends, including when the caller drops the future.
//!
//! # Invocation flow
//!
//! ```text
//! resolve tool ──> emit started ──> validate params ──> acquire capacity
//!      │                                                     │
//!  UnknownTool                                     breaker admission
//!  (nothing emitted)                                         │
//!                                     run adapter (timeout, cancellation)
//!                                                            │
//!                       record breaker ─> release token ─> metrics ─> emit terminal
//! ```

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::audit::{AuditEvent, CircuitCloseTrigger};
use crate::domain::invocation::{
    CapacityScope, CorrelationContext, InvocationError, InvocationRequest, InvocationResult,
    Parameters,
};
use crate::domain::recommendation::{
    Recommendation, RecommendationQuery, ScoringWeights, ToolStanding,
};
use crate::domain::tool::{CapabilitySet, ToolDescriptor};
use crate::ports::{
    AcquirePolicy, AdapterError, CallPermit, CapacityError, CapacityLimiter, CapacitySnapshot,
    CapacityToken, CircuitBreaker, CircuitBreakerFactory, CircuitSnapshot, CircuitState,
    CircuitTransition, HealthStatus, InvocationContext, ToolAdapter,
};

use super::audit_emitter::AuditEmitter;
use super::metrics::{MetricsRecorder, ToolStats};
use super::recommendation::RecommendationEngine;
use super::registry::{RegistryError, ToolRegistry};

/// Gateway settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Timeout applied when a request does not carry one.
    pub default_timeout: Duration,
    /// Upper bound on any requested timeout.
    pub max_timeout: Duration,
    pub acquire_policy: AcquirePolicy,
    /// Bound on each adapter's health check.
    pub health_check_timeout: Duration,
    /// Attach a SHA-256 digest of the parameters to `invocation_started`.
    pub include_input_hash: bool,
    pub scoring: ScoringWeights,
    /// Latency samples kept per tool.
    pub metrics_window: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
            acquire_policy: AcquirePolicy::Wait {
                timeout: Duration::from_secs(5),
            },
            health_check_timeout: Duration::from_secs(2),
            include_input_hash: true,
            scoring: ScoringWeights::default(),
            metrics_window: 100,
        }
    }
}

/// Health of one tool as reported by [`ToolGateway::health_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolHealth {
    pub healthy: bool,
    pub detail: String,
    pub circuit_state: CircuitState,
}

struct RegisteredTool {
    descriptor: Arc<ToolDescriptor>,
    adapter: Arc<dyn ToolAdapter>,
    breaker: Arc<dyn CircuitBreaker>,
}

impl RegisteredTool {
    fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Façade over the registry, breakers, capacity limiter, metrics and audit.
///
/// Construct one per process and share it behind an `Arc`.
pub struct ToolGateway {
    config: GatewayConfig,
    registry: ToolRegistry,
    tools: RwLock<HashMap<String, Arc<RegisteredTool>>>,
    limiter: Arc<dyn CapacityLimiter>,
    breakers: Arc<dyn CircuitBreakerFactory>,
    emitter: AuditEmitter,
    metrics: MetricsRecorder,
    recommender: RecommendationEngine,
}

impl ToolGateway {
    pub fn new(
        config: GatewayConfig,
        limiter: Arc<dyn CapacityLimiter>,
        breakers: Arc<dyn CircuitBreakerFactory>,
        emitter: AuditEmitter,
    ) -> Self {
        Self {
            metrics: MetricsRecorder::new(config.metrics_window),
            recommender: RecommendationEngine::new(config.scoring),
            config,
            registry: ToolRegistry::new(),
            tools: RwLock::new(HashMap::new()),
            limiter,
            breakers,
            emitter,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn emitter(&self) -> &AuditEmitter {
        &self.emitter
    }

    // === Registration ===

    /// Registers a tool and creates its breaker.
    ///
    /// # Errors
    ///
    /// `DuplicateTool` if the name (or an alias) is already taken.
    pub fn register(
        &self,
        descriptor: ToolDescriptor,
        adapter: Arc<dyn ToolAdapter>,
    ) -> Result<Arc<ToolDescriptor>, RegistryError> {
        let descriptor = self.registry.register(descriptor)?;
        let breaker = self.breakers.create(descriptor.name());
        let entry = Arc::new(RegisteredTool {
            descriptor: descriptor.clone(),
            adapter,
            breaker,
        });
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(descriptor.name().to_string(), entry);

        tracing::info!(
            tool = %descriptor.name(),
            version = %descriptor.version(),
            capabilities = %descriptor.capabilities(),
            "Tool registered"
        );
        Ok(descriptor)
    }

    /// Maps a legacy name onto a registered tool.
    pub fn register_alias(&self, alias: &str, target: &str) -> Result<(), RegistryError> {
        self.registry.register_alias(alias, target)
    }

    fn lookup(&self, name: &str) -> Result<Arc<RegisteredTool>, RegistryError> {
        let descriptor = self.registry.get(name)?;
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(descriptor.name())
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool {
                name: name.to_string(),
            })
    }

    fn registered(&self) -> Vec<Arc<RegisteredTool>> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        self.registry
            .all()
            .iter()
            .filter_map(|d| tools.get(d.name()).cloned())
            .collect()
    }

    // === Invocation ===

    /// Runs one tool call to completion.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        self.invoke_with_cancel(request, CancellationToken::new()).await
    }

    /// Runs one tool call, stopping early when `cancel` fires.
    ///
    /// Never returns an `Err`: every outcome is folded into the result
    /// envelope with a typed error.
    pub async fn invoke_with_cancel(
        &self,
        request: InvocationRequest,
        cancel: CancellationToken,
    ) -> InvocationResult {
        let started = Instant::now();
        let input_hash = self.config.include_input_hash.then(|| request.input_hash());
        let InvocationRequest {
            correlation,
            tool_name,
            params,
            timeout,
        } = request;

        let tool = match self.lookup(&tool_name) {
            Ok(tool) => tool,
            Err(_) => {
                tracing::debug!(
                    tool = %tool_name,
                    correlation_id = %correlation.correlation_id,
                    "Invocation of unknown tool"
                );
                return InvocationResult::failed(
                    InvocationError::unknown_tool(tool_name),
                    started.elapsed(),
                    None,
                    correlation,
                );
            }
        };

        self.emitter.emit(&AuditEvent::started(
            tool.name(),
            &correlation,
            tool.descriptor.version(),
            input_hash,
        ));
        tracing::debug!(
            tool = %tool.name(),
            correlation_id = %correlation.correlation_id,
            "Invocation started"
        );

        let mut call = InFlightInvocation {
            gateway: self,
            tool: tool.clone(),
            correlation,
            started,
            token: None,
            permit: None,
            cancel: cancel.child_token(),
            finished: false,
        };

        if let Err(e) = tool.descriptor.input_schema().validate(&params) {
            return call.finish(Err(InvocationError::validation(tool.name(), e)));
        }

        let budget = timeout
            .unwrap_or(self.config.default_timeout)
            .min(self.config.max_timeout);

        let policy = match self.config.acquire_policy {
            AcquirePolicy::FailFast => AcquirePolicy::FailFast,
            AcquirePolicy::Wait { timeout } => AcquirePolicy::Wait {
                timeout: timeout.min(budget),
            },
        };
        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => return call.finish(Err(InvocationError::cancelled(tool.name()))),
            acquired = self.limiter.acquire(tool.name(), policy) => acquired,
        };
        match acquired {
            Ok(token) => call.token = Some(token),
            Err(e) => return call.finish(Err(capacity_error(tool.name(), e))),
        }

        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return call.finish(Err(InvocationError::timeout(tool.name(), budget)));
        }

        match tool.breaker.try_acquire() {
            Ok((permit, transition)) => {
                call.permit = Some(permit);
                self.publish_transition(&tool, &call.correlation, transition);
            }
            Err(open) => {
                return call.finish(Err(InvocationError::CircuitOpen {
                    tool: tool.name().to_string(),
                    retry_after_ms: open.retry_after.as_millis() as u64,
                }));
            }
        }

        let ctx = InvocationContext::new(call.correlation.clone(), remaining, call.cancel.clone());
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InvocationError::cancelled(tool.name())),
            result = tokio::time::timeout(remaining, tool.adapter.invoke(&params, &ctx)) => match result {
                Ok(Ok(payload)) => Ok(payload),
                Ok(Err(e)) => Err(adapter_error(tool.name(), e)),
                Err(_) => Err(InvocationError::timeout(tool.name(), remaining)),
            },
        };
        call.finish(outcome)
    }

    fn publish_transition(
        &self,
        tool: &RegisteredTool,
        correlation: &CorrelationContext,
        transition: Option<CircuitTransition>,
    ) {
        let event = match transition {
            Some(CircuitTransition::Opened {
                consecutive_failures,
            }) => AuditEvent::circuit_opened(
                tool.name(),
                correlation,
                consecutive_failures,
                tool.breaker.metrics().recovery_timeout,
            ),
            Some(CircuitTransition::Reopened) => {
                let snapshot = tool.breaker.metrics();
                AuditEvent::circuit_opened(
                    tool.name(),
                    correlation,
                    snapshot.consecutive_failures,
                    snapshot.recovery_timeout,
                )
            }
            Some(CircuitTransition::Closed) => AuditEvent::circuit_closed(
                tool.name(),
                correlation,
                CircuitCloseTrigger::ProbeSucceeded,
            ),
            Some(CircuitTransition::HalfOpened) | None => return,
        };
        self.emitter.emit(&event);
    }

    // === Queries ===

    /// Ranks registered tools for a query. Read-only.
    pub fn recommend(&self, query: &RecommendationQuery) -> Vec<Recommendation> {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        self.recommender.recommend(query, &self.registry, |name| {
            let stats = self.metrics.stats(name);
            ToolStanding {
                circuit: tools
                    .get(name)
                    .map(|t| t.breaker.state())
                    .unwrap_or(CircuitState::Closed),
                success_rate: stats.success_rate,
                samples: stats.total,
            }
        })
    }

    /// Checks every adapter concurrently.
    ///
    /// A check that exceeds the health-check timeout, or panics, reports the
    /// tool as unhealthy; the snapshot itself always completes.
    pub async fn health_snapshot(&self) -> BTreeMap<String, ToolHealth> {
        let limit = self.config.health_check_timeout;
        let tools = self.registered();

        let checks = tools.iter().map(|tool| {
            let adapter = tool.adapter.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(limit, adapter.health_check()).await {
                    Ok(status) => status,
                    Err(_) => HealthStatus::unhealthy(format!(
                        "health check timed out after {}ms",
                        limit.as_millis()
                    )),
                }
            })
        });
        let statuses = join_all(checks).await;

        tools
            .iter()
            .zip(statuses)
            .map(|(tool, joined)| {
                let status = joined.unwrap_or_else(|e| {
                    tracing::error!(tool = %tool.name(), error = %e, "Health check task failed");
                    HealthStatus::unhealthy(format!("health check failed: {}", e))
                });
                if !status.healthy {
                    tracing::warn!(tool = %tool.name(), detail = %status.detail, "Tool unhealthy");
                }
                (
                    tool.name().to_string(),
                    ToolHealth {
                        healthy: status.healthy,
                        detail: status.detail,
                        circuit_state: tool.breaker.state(),
                    },
                )
            })
            .collect()
    }

    /// Rolling statistics for every registered tool.
    pub fn metrics(&self) -> BTreeMap<String, ToolStats> {
        self.registry
            .all()
            .iter()
            .map(|d| (d.name().to_string(), self.metrics.stats(d.name())))
            .collect()
    }

    pub fn tool_metrics(&self, name: &str) -> Result<ToolStats, RegistryError> {
        let tool = self.lookup(name)?;
        Ok(self.metrics.stats(tool.name()))
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
        tracing::info!("Invocation metrics reset");
    }

    pub fn list_tools(&self, filter: &CapabilitySet) -> Vec<Arc<ToolDescriptor>> {
        self.registry.list(filter)
    }

    /// Caller-facing description of a tool, including its breaker state.
    pub fn describe_tool(&self, name: &str) -> Result<Value, RegistryError> {
        let tool = self.lookup(name)?;
        let mut description = tool.descriptor.to_json();
        if let Value::Object(map) = &mut description {
            map.insert(
                "circuit_state".to_string(),
                Value::String(tool.breaker.state().to_string()),
            );
        }
        Ok(description)
    }

    /// Expected run time of a tool for the given parameters.
    pub fn estimate_cost(&self, name: &str, params: &Parameters) -> Result<Duration, RegistryError> {
        Ok(self.lookup(name)?.adapter.estimated_cost(params))
    }

    // === Operator surface ===

    pub fn circuit_status(&self, name: &str) -> Result<CircuitSnapshot, RegistryError> {
        Ok(self.lookup(name)?.breaker.metrics())
    }

    pub fn circuit_statuses(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.registered()
            .iter()
            .map(|tool| (tool.name().to_string(), tool.breaker.metrics()))
            .collect()
    }

    /// Forces a tool's breaker closed.
    ///
    /// Returns true if the breaker was not already closed, in which case a
    /// `circuit_closed` event is emitted under a fresh correlation id.
    pub fn reset_circuit(&self, name: &str) -> Result<bool, RegistryError> {
        let tool = self.lookup(name)?;
        let changed = tool.breaker.reset().is_some();
        if changed {
            let correlation = CorrelationContext::new();
            tracing::info!(
                tool = %tool.name(),
                correlation_id = %correlation.correlation_id,
                "Circuit reset by operator"
            );
            self.emitter.emit(&AuditEvent::circuit_closed(
                tool.name(),
                &correlation,
                CircuitCloseTrigger::OperatorReset,
            ));
        }
        Ok(changed)
    }

    pub fn capacity_snapshot(&self) -> CapacitySnapshot {
        self.limiter.snapshot()
    }
}

fn capacity_error(tool: &str, err: CapacityError) -> InvocationError {
    tracing::warn!(tool = %tool, error = %err, "Capacity rejected invocation");
    InvocationError::CapacityExceeded {
        tool: tool.to_string(),
        scope: err.scope().unwrap_or(CapacityScope::Global),
    }
}

fn adapter_error(tool: &str, err: AdapterError) -> InvocationError {
    match err {
        AdapterError::InvalidParameters(e) => InvocationError::validation(tool, e),
        AdapterError::Timeout(after) => InvocationError::timeout(tool, after),
        AdapterError::Execution(message) => InvocationError::execution(tool, message),
        e @ AdapterError::Unavailable(_) => InvocationError::execution(tool, e.to_string()),
    }
}

/// Resources held by one invocation.
///
/// `finish` settles the breaker, releases capacity, updates metrics and
/// emits the terminal event. If the invocation future is dropped first,
/// `Drop` does the same with a cancelled outcome.
struct InFlightInvocation<'a> {
    gateway: &'a ToolGateway,
    tool: Arc<RegisteredTool>,
    correlation: CorrelationContext,
    started: Instant,
    token: Option<CapacityToken>,
    permit: Option<CallPermit>,
    cancel: CancellationToken,
    finished: bool,
}

impl InFlightInvocation<'_> {
    fn finish(mut self, outcome: Result<Value, InvocationError>) -> InvocationResult {
        self.finished = true;
        let duration = self.started.elapsed();
        let name = self.tool.name().to_string();

        let mut executed = false;
        if let Some(permit) = self.permit.take() {
            executed = outcome.as_ref().map_or_else(|e| e.counts_toward_breaker(), |_| true);
            let transition = match &outcome {
                Ok(_) => self.tool.breaker.record_success(permit),
                Err(e) if e.counts_toward_breaker() => self.tool.breaker.record_failure(permit),
                Err(_) => {
                    self.tool.breaker.release_neutral(permit);
                    None
                }
            };
            self.gateway
                .publish_transition(&self.tool, &self.correlation, transition);
        }
        self.release_capacity();
        self.gateway.metrics.record(&name, &outcome, executed, duration);

        let version = self.tool.descriptor.version().to_string();
        let correlation = self.correlation.clone();
        match outcome {
            Ok(payload) => {
                self.gateway
                    .emitter
                    .emit(&AuditEvent::succeeded(&name, &correlation, duration));
                tracing::debug!(
                    tool = %name,
                    correlation_id = %correlation.correlation_id,
                    duration_ms = duration.as_millis() as u64,
                    "Invocation succeeded"
                );
                InvocationResult::succeeded(name, payload, duration, version, correlation)
            }
            Err(error) => {
                self.gateway
                    .emitter
                    .emit(&AuditEvent::failed(&name, &correlation, &error, duration));
                tracing::info!(
                    tool = %name,
                    correlation_id = %correlation.correlation_id,
                    error_kind = %error.kind(),
                    error = %error,
                    "Invocation failed"
                );
                InvocationResult::failed(error, duration, Some(version), correlation)
            }
        }
    }

    fn release_capacity(&mut self) {
        if let Some(mut token) = self.token.take() {
            if let Err(e) = token.release() {
                tracing::error!(tool = %self.tool.name(), error = %e, "Capacity release failed");
            }
        }
    }
}

impl Drop for InFlightInvocation<'_> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if self.finished {
            return;
        }

        let duration = self.started.elapsed();
        let error = InvocationError::cancelled(self.tool.name());
        if let Some(permit) = self.permit.take() {
            self.tool.breaker.release_neutral(permit);
        }
        self.release_capacity();
        self.gateway
            .metrics
            .record(self.tool.name(), &Err(error.clone()), false, duration);
        self.gateway.emitter.emit(&AuditEvent::failed(
            self.tool.name(),
            &self.correlation,
            &error,
            duration,
        ));
        tracing::warn!(
            tool = %self.tool.name(),
            correlation_id = %self.correlation.correlation_id,
            "Invocation dropped before completion"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::capacity::{CapacityCeilings, SemaphoreCapacityLimiter};
    use crate::adapters::events::InMemoryAuditSink;
    use crate::adapters::resilience::InMemoryCircuitBreakerFactory;
    use crate::adapters::tools::{MockOutcome, MockToolAdapter};
    use crate::application::audit_emitter::AuditEmitterConfig;
    use crate::domain::audit::{AuditEventType, FailureReason};
    use crate::domain::foundation::ValidationError;
    use crate::domain::invocation::ErrorKind;
    use crate::domain::resilience::CircuitBreakerConfig;
    use crate::domain::tool::{FieldKind, ToolCapability, ToolSchema};
    use serde_json::json;
    use tokio::sync::watch;

    struct Harness {
        gateway: Arc<ToolGateway>,
        sink: Arc<InMemoryAuditSink>,
        _shutdown: watch::Sender<bool>,
    }

    fn harness(config: GatewayConfig, ceilings: CapacityCeilings, breaker: CircuitBreakerConfig) -> Harness {
        let sink = Arc::new(InMemoryAuditSink::new());
        let (emitter, worker) = AuditEmitter::new(sink.clone(), AuditEmitterConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        worker.spawn(shutdown_rx);
        let gateway = ToolGateway::new(
            config,
            Arc::new(SemaphoreCapacityLimiter::new(ceilings)),
            Arc::new(InMemoryCircuitBreakerFactory::new(breaker)),
            emitter,
        );
        Harness {
            gateway: Arc::new(gateway),
            sink,
            _shutdown: shutdown_tx,
        }
    }

    fn default_harness() -> Harness {
        harness(
            GatewayConfig::default(),
            CapacityCeilings::default(),
            CircuitBreakerConfig::new(3, Duration::from_secs(5)),
        )
    }

    fn blast() -> ToolDescriptor {
        ToolDescriptor::builder("blast_search")
            .capability(ToolCapability::Bioinformatics)
            .input_schema(ToolSchema::new().required("sequence", FieldKind::String))
            .version("2.14.0")
            .build()
            .unwrap()
    }

    fn request() -> InvocationRequest {
        InvocationRequest::new("blast_search").with_param("sequence", "ATCG")
    }

    async fn events(h: &Harness) -> Vec<AuditEvent> {
        h.gateway.emitter().flush().await;
        h.sink.audit_events()
    }

    #[tokio::test]
    async fn successful_invocation_emits_started_and_succeeded() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_outcome(MockOutcome::Success(json!({"hits": 2})));
        h.gateway.register(blast(), Arc::new(tool.clone())).unwrap();

        let result = h.gateway.invoke(request()).await;

        assert!(result.success);
        assert_eq!(result.payload(), Some(&json!({"hits": 2})));
        assert_eq!(result.tool_version.as_deref(), Some("2.14.0"));
        let events = events(&h).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![AuditEventType::InvocationStarted, AuditEventType::InvocationSucceeded]
        );
        assert!(events
            .iter()
            .all(|e| e.correlation_id() == result.correlation.correlation_id.as_str()));
        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 0);
    }

    #[tokio::test]
    async fn unknown_tool_touches_nothing() {
        let h = default_harness();

        let result = h.gateway.invoke(InvocationRequest::new("nope")).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownTool));
        assert!(result.tool_version.is_none());
        assert!(events(&h).await.is_empty());
        assert!(h.gateway.metrics().is_empty());
    }

    #[tokio::test]
    async fn alias_resolves_to_canonical_tool() {
        let h = default_harness();
        h.gateway
            .register(blast(), Arc::new(MockToolAdapter::new()))
            .unwrap();
        h.gateway.register_alias("blast", "blast_search").unwrap();

        let result = h
            .gateway
            .invoke(InvocationRequest::new("blast").with_param("sequence", "ATCG"))
            .await;

        assert!(result.success);
        assert_eq!(result.tool_name, "blast_search");
        assert_eq!(h.gateway.metrics()["blast_search"].successes, 1);
    }

    #[tokio::test]
    async fn validation_failure_does_not_reach_adapter_or_breaker() {
        let h = default_harness();
        let tool = MockToolAdapter::new();
        h.gateway.register(blast(), Arc::new(tool.clone())).unwrap();

        for _ in 0..5 {
            let result = h.gateway.invoke(InvocationRequest::new("blast_search")).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        }

        assert_eq!(tool.call_count(), 0);
        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().state, CircuitState::Closed);
        let reasons: Vec<_> = events(&h)
            .await
            .iter()
            .filter_map(AuditEvent::failure_reason)
            .collect();
        assert_eq!(reasons, vec![FailureReason::Validation; 5]);
        assert_eq!(h.sink.events_of_type("invocation_started").len(), 5);
        assert_eq!(h.gateway.metrics()["blast_search"].rejected, 5);
    }

    #[tokio::test]
    async fn adapter_rejecting_inputs_does_not_trip_breaker() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::InvalidParameters(
            ValidationError::invalid_format("sequence", "not nucleotides"),
        ));
        h.gateway.register(blast(), Arc::new(tool.clone())).unwrap();

        for _ in 0..4 {
            let result = h.gateway.invoke(request()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::Validation));
        }
        assert_eq!(tool.call_count(), 4);
        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn execution_failures_open_circuit_and_emit_event() {
        let h = default_harness();
        let tool = MockToolAdapter::new()
            .with_default_outcome(MockOutcome::Unavailable("connection refused".into()));
        h.gateway.register(blast(), Arc::new(tool.clone())).unwrap();

        for _ in 0..3 {
            let result = h.gateway.invoke(request()).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::AdapterExecution));
        }
        let rejected = h.gateway.invoke(request()).await;

        assert_eq!(rejected.error_kind(), Some(ErrorKind::CircuitOpen));
        assert_eq!(tool.call_count(), 3);
        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 0);
        let events = events(&h).await;
        assert_eq!(
            events
                .iter()
                .filter(|e| e.event_type() == AuditEventType::CircuitOpened)
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_is_capped_by_max_timeout() {
        let config = GatewayConfig {
            max_timeout: Duration::from_secs(2),
            ..GatewayConfig::default()
        };
        let h = harness(config, CapacityCeilings::default(), CircuitBreakerConfig::default());
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Hang);
        h.gateway.register(blast(), Arc::new(tool)).unwrap();

        let result = h
            .gateway
            .invoke(request().with_timeout(Duration::from_secs(60)))
            .await;

        assert_eq!(
            result.error(),
            Some(&InvocationError::Timeout {
                tool: "blast_search".into(),
                timeout_ms: 2000
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_is_rejected_without_counting_a_failure() {
        let h = default_harness();
        let tool = MockToolAdapter::new();
        h.gateway.register(blast(), Arc::new(tool.clone())).unwrap();

        for _ in 0..3 {
            let result = h.gateway.invoke(request().with_timeout(Duration::ZERO)).await;
            assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        }

        assert_eq!(tool.call_count(), 0);
        let stats = h.gateway.tool_metrics("blast_search").unwrap();
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.success_rate, None);
        assert_eq!(stats.avg_latency_ms, None);
        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().state, CircuitState::Closed);
        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_releases_capacity() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Hang);
        h.gateway.register(blast(), Arc::new(tool)).unwrap();

        let cancel = CancellationToken::new();
        let gateway = h.gateway.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { gateway.invoke_with_cancel(request(), token).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 1);
        cancel.cancel();
        let result = handle.await.unwrap();

        assert_eq!(result.error_kind(), Some(ErrorKind::Cancelled));
        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 0);
        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().consecutive_failures, 0);
        let events = events(&h).await;
        assert_eq!(events.last().and_then(AuditEvent::failure_reason), Some(FailureReason::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_invocation_emits_cancelled_terminal_event() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Hang);
        h.gateway.register(blast(), Arc::new(tool)).unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(100), h.gateway.invoke(request())).await;
        assert!(outcome.is_err());

        assert_eq!(h.gateway.capacity_snapshot().global.in_flight, 0);
        let events = events(&h).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].failure_reason(), Some(FailureReason::Cancelled));
    }

    #[tokio::test]
    async fn fail_fast_capacity_rejects_when_saturated() {
        let config = GatewayConfig {
            acquire_policy: AcquirePolicy::FailFast,
            ..GatewayConfig::default()
        };
        let h = harness(config, CapacityCeilings::new(1, 1), CircuitBreakerConfig::default());
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Hang);
        h.gateway.register(blast(), Arc::new(tool)).unwrap();

        let cancel = CancellationToken::new();
        let gateway = h.gateway.clone();
        let token = cancel.clone();
        let first = tokio::spawn(async move { gateway.invoke_with_cancel(request(), token).await });
        while h.gateway.capacity_snapshot().global.in_flight == 0 {
            tokio::task::yield_now().await;
        }

        let second = h.gateway.invoke(request()).await;
        assert_eq!(
            second.error(),
            Some(&InvocationError::CapacityExceeded {
                tool: "blast_search".into(),
                scope: CapacityScope::Tool
            })
        );

        cancel.cancel();
        first.await.unwrap();
    }

    #[tokio::test]
    async fn operator_reset_closes_circuit_with_event() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_default_outcome(MockOutcome::Fail("boom".into()));
        h.gateway.register(blast(), Arc::new(tool)).unwrap();
        for _ in 0..3 {
            h.gateway.invoke(request()).await;
        }
        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().state, CircuitState::Open);

        assert!(h.gateway.reset_circuit("blast_search").unwrap());
        assert!(!h.gateway.reset_circuit("blast_search").unwrap());

        assert_eq!(h.gateway.circuit_status("blast_search").unwrap().state, CircuitState::Closed);
        let events = events(&h).await;
        assert_eq!(
            events.last().map(AuditEvent::event_type),
            Some(AuditEventType::CircuitClosed)
        );
        assert!(matches!(
            h.gateway.reset_circuit("missing"),
            Err(RegistryError::UnknownTool { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn health_snapshot_isolates_slow_adapter() {
        let h = default_harness();
        h.gateway.register(blast(), Arc::new(MockToolAdapter::new())).unwrap();
        let slow = MockToolAdapter::new().with_health_delay(Duration::from_secs(60));
        h.gateway
            .register(
                ToolDescriptor::builder("slow_tool").build().unwrap(),
                Arc::new(slow),
            )
            .unwrap();
        let sick = MockToolAdapter::new();
        sick.set_health(HealthStatus::unhealthy("device offline"));
        h.gateway
            .register(ToolDescriptor::builder("sick_tool").build().unwrap(), Arc::new(sick))
            .unwrap();

        let snapshot = h.gateway.health_snapshot().await;

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot["blast_search"].healthy);
        assert!(!snapshot["slow_tool"].healthy);
        assert!(snapshot["slow_tool"].detail.contains("timed out"));
        assert_eq!(snapshot["sick_tool"].detail, "device offline");
    }

    #[tokio::test]
    async fn describe_and_estimate_use_registered_adapter() {
        let h = default_harness();
        let tool = MockToolAdapter::new().with_estimated_cost(Duration::from_millis(1500));
        h.gateway.register(blast(), Arc::new(tool)).unwrap();

        let description = h.gateway.describe_tool("blast_search").unwrap();
        assert_eq!(description["circuit_state"], "CLOSED");
        assert_eq!(description["version"], "2.14.0");
        assert_eq!(
            h.gateway
                .estimate_cost("blast_search", &Parameters::new())
                .unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(h.gateway.list_tools(&CapabilitySet::new()).len(), 1);
    }
}
