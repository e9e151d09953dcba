//! Tokio-semaphore capacity limiter.
//!
//! One semaphore for the global ceiling and one per tool, created lazily on
//! first use. The per-tool permit is taken first so a tool stuck at its own
//! ceiling never holds a global slot.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::Instant;

use crate::domain::invocation::CapacityScope;
use crate::ports::{
    AcquirePolicy, CapacityError, CapacityLease, CapacityLimiter, CapacitySnapshot, CapacityToken,
    CeilingUsage,
};

/// Ceiling configuration for [`SemaphoreCapacityLimiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityCeilings {
    pub global_max: usize,
    pub per_tool_max: usize,
    pub tool_overrides: HashMap<String, usize>,
}

impl Default for CapacityCeilings {
    fn default() -> Self {
        Self {
            global_max: 16,
            per_tool_max: 4,
            tool_overrides: HashMap::new(),
        }
    }
}

impl CapacityCeilings {
    pub fn new(global_max: usize, per_tool_max: usize) -> Self {
        Self {
            global_max,
            per_tool_max,
            tool_overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, tool_name: impl Into<String>, max: usize) -> Self {
        self.tool_overrides.insert(tool_name.into(), max);
        self
    }

    pub fn max_for(&self, tool_name: &str) -> usize {
        self.tool_overrides
            .get(tool_name)
            .copied()
            .unwrap_or(self.per_tool_max)
    }
}

#[derive(Debug, Clone)]
struct ToolPool {
    semaphore: Arc<Semaphore>,
    max: usize,
}

/// Semaphore-based [`CapacityLimiter`].
#[derive(Debug)]
pub struct SemaphoreCapacityLimiter {
    ceilings: CapacityCeilings,
    global: Arc<Semaphore>,
    tools: Mutex<HashMap<String, ToolPool>>,
}

impl SemaphoreCapacityLimiter {
    pub fn new(ceilings: CapacityCeilings) -> Self {
        Self {
            global: Arc::new(Semaphore::new(ceilings.global_max)),
            ceilings,
            tools: Mutex::new(HashMap::new()),
        }
    }

    fn pool(&self, tool_name: &str) -> ToolPool {
        let mut tools = self.tools.lock().unwrap_or_else(PoisonError::into_inner);
        tools
            .entry(tool_name.to_string())
            .or_insert_with(|| {
                let max = self.ceilings.max_for(tool_name);
                ToolPool {
                    semaphore: Arc::new(Semaphore::new(max)),
                    max,
                }
            })
            .clone()
    }

    fn try_take(
        semaphore: &Arc<Semaphore>,
        tool_name: &str,
        scope: CapacityScope,
    ) -> Result<OwnedSemaphorePermit, CapacityError> {
        semaphore.clone().try_acquire_owned().map_err(|e| match e {
            TryAcquireError::NoPermits => {
                tracing::debug!(tool = %tool_name, %scope, "Capacity exhausted");
                CapacityError::Exhausted {
                    tool: tool_name.to_string(),
                    scope,
                }
            }
            TryAcquireError::Closed => CapacityError::Closed,
        })
    }

    async fn wait_take(
        semaphore: &Arc<Semaphore>,
        tool_name: &str,
        scope: CapacityScope,
        budget: Duration,
    ) -> Result<OwnedSemaphorePermit, CapacityError> {
        match tokio::time::timeout(budget, semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(CapacityError::Closed),
            Err(_) => {
                tracing::debug!(tool = %tool_name, %scope, "Timed out waiting for capacity");
                Err(CapacityError::WaitTimedOut {
                    tool: tool_name.to_string(),
                    scope,
                    waited: budget,
                })
            }
        }
    }
}

struct SemaphoreLease {
    _tool: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl CapacityLease for SemaphoreLease {
    fn release(self: Box<Self>) {
        drop(self);
    }
}

#[async_trait]
impl CapacityLimiter for SemaphoreCapacityLimiter {
    async fn acquire(
        &self,
        tool_name: &str,
        policy: AcquirePolicy,
    ) -> Result<CapacityToken, CapacityError> {
        let pool = self.pool(tool_name);

        let (tool_permit, global_permit) = match policy {
            AcquirePolicy::FailFast => {
                let tool_permit = Self::try_take(&pool.semaphore, tool_name, CapacityScope::Tool)?;
                let global_permit = Self::try_take(&self.global, tool_name, CapacityScope::Global)?;
                (tool_permit, global_permit)
            }
            AcquirePolicy::Wait { timeout } => {
                let deadline = Instant::now() + timeout;
                let tool_permit =
                    Self::wait_take(&pool.semaphore, tool_name, CapacityScope::Tool, timeout).await?;
                let remaining = deadline.saturating_duration_since(Instant::now());
                let global_permit =
                    Self::wait_take(&self.global, tool_name, CapacityScope::Global, remaining)
                        .await?;
                (tool_permit, global_permit)
            }
        };

        Ok(CapacityToken::new(
            tool_name,
            Box::new(SemaphoreLease {
                _tool: tool_permit,
                _global: global_permit,
            }),
        ))
    }

    fn snapshot(&self) -> CapacitySnapshot {
        let global_max = self.ceilings.global_max;
        let global_in_flight = global_max.saturating_sub(self.global.available_permits());

        let tools = self.tools.lock().unwrap_or_else(PoisonError::into_inner);
        let tools: BTreeMap<String, CeilingUsage> = tools
            .iter()
            .map(|(name, pool)| {
                let in_flight = pool.max.saturating_sub(pool.semaphore.available_permits());
                (name.clone(), CeilingUsage::new(in_flight, pool.max))
            })
            .collect();

        CapacitySnapshot {
            global: CeilingUsage::new(global_in_flight, global_max),
            tools,
        }
    }
}
