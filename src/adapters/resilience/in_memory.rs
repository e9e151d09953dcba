//! In-process circuit breaker backed by a mutex-guarded state machine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use crate::domain::resilience::CircuitStateMachine;
use crate::ports::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerFactory, CircuitOpen,
    CircuitSnapshot, CircuitState, CircuitTransition,
};

/// Breaker for one tool. The lock is held only while the state machine
/// decides, never across a tool call.
#[derive(Debug)]
pub struct InMemoryCircuitBreaker {
    tool_name: String,
    machine: Mutex<CircuitStateMachine>,
}

impl InMemoryCircuitBreaker {
    pub fn new(tool_name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            tool_name: tool_name.into(),
            machine: Mutex::new(CircuitStateMachine::new(config, Instant::now())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CircuitStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_transition(&self, transition: Option<CircuitTransition>) -> Option<CircuitTransition> {
        match transition {
            Some(CircuitTransition::Opened {
                consecutive_failures,
            }) => tracing::warn!(
                tool = %self.tool_name,
                consecutive_failures,
                "Circuit opened"
            ),
            Some(CircuitTransition::HalfOpened) => {
                tracing::info!(tool = %self.tool_name, "Circuit half-open, admitting probe")
            }
            Some(CircuitTransition::Reopened) => {
                tracing::warn!(tool = %self.tool_name, "Probe failed, circuit reopened")
            }
            Some(CircuitTransition::Closed) => {
                tracing::info!(tool = %self.tool_name, "Circuit closed")
            }
            None => {}
        }
        transition
    }
}

impl CircuitBreaker for InMemoryCircuitBreaker {
    fn state(&self) -> CircuitState {
        self.lock().state()
    }

    fn try_acquire(&self) -> Result<(CallPermit, Option<CircuitTransition>), CircuitOpen> {
        let result = self.lock().try_acquire(Instant::now());
        match result {
            Ok((permit, transition)) => Ok((permit, self.log_transition(transition))),
            Err(open) => {
                tracing::debug!(
                    tool = %self.tool_name,
                    retry_after_ms = open.retry_after.as_millis() as u64,
                    "Circuit rejected call"
                );
                Err(open)
            }
        }
    }

    fn record_success(&self, permit: CallPermit) -> Option<CircuitTransition> {
        let transition = self.lock().on_success(permit, Instant::now());
        self.log_transition(transition)
    }

    fn record_failure(&self, permit: CallPermit) -> Option<CircuitTransition> {
        let transition = self.lock().on_failure(permit, Instant::now());
        self.log_transition(transition)
    }

    fn release_neutral(&self, permit: CallPermit) {
        self.lock().release_neutral(permit);
    }

    fn reset(&self) -> Option<CircuitTransition> {
        let transition = self.lock().reset(Instant::now());
        if transition.is_some() {
            tracing::info!(tool = %self.tool_name, "Circuit reset by operator");
        }
        transition
    }

    fn metrics(&self) -> CircuitSnapshot {
        self.lock().snapshot(Instant::now())
    }
}

/// Builds [`InMemoryCircuitBreaker`]s from a default config plus per-tool
/// overrides.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCircuitBreakerFactory {
    default: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
}

impl InMemoryCircuitBreakerFactory {
    pub fn new(default: CircuitBreakerConfig) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, tool_name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(tool_name.into(), config);
        self
    }

    pub fn config_for(&self, tool_name: &str) -> CircuitBreakerConfig {
        self.overrides.get(tool_name).copied().unwrap_or(self.default)
    }
}

impl CircuitBreakerFactory for InMemoryCircuitBreakerFactory {
    fn create(&self, tool_name: &str) -> Arc<dyn CircuitBreaker> {
        Arc::new(InMemoryCircuitBreaker::new(tool_name, self.config_for(tool_name)))
    }
}
