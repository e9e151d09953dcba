//! CapacityLimiter port - bounds concurrently running invocations.
//!
//! Two independent ceilings apply: a global one shared by every tool and a
//! per-tool one. An acquired slot is represented by a [`CapacityToken`] that
//! the invocation owns exclusively and must release on every exit path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::invocation::CapacityScope;

/// Port for concurrency limiting.
#[async_trait]
pub trait CapacityLimiter: Send + Sync {
    /// Reserves one slot for `tool_name` under both ceilings.
    ///
    /// With [`AcquirePolicy::FailFast`] a saturated ceiling fails at once;
    /// with [`AcquirePolicy::Wait`] the call waits up to the timeout.
    async fn acquire(
        &self,
        tool_name: &str,
        policy: AcquirePolicy,
    ) -> Result<CapacityToken, CapacityError>;

    /// Current occupancy of every ceiling.
    fn snapshot(&self) -> CapacitySnapshot;
}

/// What to do when a ceiling is saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePolicy {
    FailFast,
    Wait { timeout: Duration },
}

/// Returns reserved slots to the limiter. Implemented by limiter adapters.
pub trait CapacityLease: Send + Sync {
    fn release(self: Box<Self>);
}

/// One reserved concurrency slot.
///
/// Releasing twice is reported as [`CapacityError::AlreadyReleased`]. A token
/// dropped while still held gives its slot back and logs a warning.
pub struct CapacityToken {
    id: Uuid,
    tool_name: String,
    acquired_at: Instant,
    lease: Option<Box<dyn CapacityLease>>,
}

impl CapacityToken {
    pub fn new(tool_name: impl Into<String>, lease: Box<dyn CapacityLease>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            acquired_at: Instant::now(),
            lease: Some(lease),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    pub fn is_released(&self) -> bool {
        self.lease.is_none()
    }

    /// Gives the slot back.
    ///
    /// # Errors
    ///
    /// `AlreadyReleased` if the token was released before.
    pub fn release(&mut self) -> Result<(), CapacityError> {
        match self.lease.take() {
            Some(lease) => {
                lease.release();
                Ok(())
            }
            None => {
                tracing::error!(
                    token_id = %self.id,
                    tool = %self.tool_name,
                    "Capacity token released twice"
                );
                Err(CapacityError::AlreadyReleased { token_id: self.id })
            }
        }
    }
}

impl Drop for CapacityToken {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            tracing::warn!(
                token_id = %self.id,
                tool = %self.tool_name,
                "Capacity token dropped while held, releasing"
            );
            lease.release();
        }
    }
}

impl fmt::Debug for CapacityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacityToken")
            .field("id", &self.id)
            .field("tool_name", &self.tool_name)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Occupancy of one ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CeilingUsage {
    pub in_flight: usize,
    pub max: usize,
    pub available: usize,
    pub utilization_percent: f64,
}

impl CeilingUsage {
    pub fn new(in_flight: usize, max: usize) -> Self {
        let utilization_percent = if max == 0 {
            0.0
        } else {
            in_flight as f64 / max as f64 * 100.0
        };
        Self {
            in_flight,
            max,
            available: max.saturating_sub(in_flight),
            utilization_percent,
        }
    }
}

/// Occupancy of the global ceiling and every per-tool ceiling seen so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub global: CeilingUsage,
    pub tools: BTreeMap<String, CeilingUsage>,
}

/// Errors that can occur while acquiring or releasing capacity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityError {
    #[error("{scope} capacity exhausted for {tool}")]
    Exhausted { tool: String, scope: CapacityScope },

    #[error("timed out after {waited:?} waiting for {scope} capacity for {tool}")]
    WaitTimedOut {
        tool: String,
        scope: CapacityScope,
        waited: Duration,
    },

    #[error("capacity token {token_id} already released")]
    AlreadyReleased { token_id: Uuid },

    #[error("capacity limiter closed")]
    Closed,
}

impl CapacityError {
    /// Which ceiling was saturated, if this is a saturation error.
    pub fn scope(&self) -> Option<CapacityScope> {
        match self {
            CapacityError::Exhausted { scope, .. } | CapacityError::WaitTimedOut { scope, .. } => {
                Some(*scope)
            }
            _ => None,
        }
    }
}
