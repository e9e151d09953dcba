//! Rolling per-tool invocation metrics.
//!
//! Counts are exact; latency is averaged over a bounded window of recent
//! executions. Readers only need approximate recency, so a single mutex is
//! held just long enough to update or copy the counters.

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::invocation::InvocationError;

/// Aggregated statistics for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStats {
    /// Invocations that reached the tool (successes + failures).
    pub total: u64,
    pub successes: u64,
    /// Execution failures (tool errors and timeouts).
    pub failures: u64,
    /// Invocations stopped before or without a verdict on the tool
    /// (capacity, open circuit, validation, cancellation).
    pub rejected: u64,
    pub success_rate: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_invoked_at: Option<Timestamp>,
}

impl ToolStats {
    fn empty() -> Self {
        Self {
            total: 0,
            successes: 0,
            failures: 0,
            rejected: 0,
            success_rate: None,
            avg_latency_ms: None,
            last_invoked_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    successes: u64,
    failures: u64,
    rejected: u64,
    latencies: VecDeque<Duration>,
    last_invoked_at: Option<Timestamp>,
}

impl Counters {
    fn stats(&self) -> ToolStats {
        let total = self.successes + self.failures;
        let success_rate = (total > 0).then(|| self.successes as f64 / total as f64);
        let avg_latency_ms = (!self.latencies.is_empty()).then(|| {
            let sum: Duration = self.latencies.iter().sum();
            sum.as_nanos() as f64 / 1_000_000.0 / self.latencies.len() as f64
        });
        ToolStats {
            total,
            successes: self.successes,
            failures: self.failures,
            rejected: self.rejected,
            success_rate,
            avg_latency_ms,
            last_invoked_at: self.last_invoked_at,
        }
    }
}

/// Thread-safe metrics store.
#[derive(Debug)]
pub struct MetricsRecorder {
    window: usize,
    tools: Mutex<HashMap<String, Counters>>,
}

impl MetricsRecorder {
    /// Creates a recorder keeping up to `window` latency samples per tool.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            tools: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Counters>> {
        self.tools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the outcome of one invocation.
    ///
    /// `executed` is true only when the tool ran and returned a verdict
    /// (success or an execution failure); everything else is a rejection
    /// and contributes no latency sample.
    pub fn record(
        &self,
        tool: &str,
        outcome: &Result<Value, InvocationError>,
        executed: bool,
        latency: Duration,
    ) {
        let mut tools = self.lock();
        let counters = tools.entry(tool.to_string()).or_default();
        counters.last_invoked_at = Some(Timestamp::now());

        if !executed {
            counters.rejected += 1;
            return;
        }
        match outcome {
            Ok(_) => counters.successes += 1,
            Err(_) => counters.failures += 1,
        }
        if counters.latencies.len() == self.window {
            counters.latencies.pop_front();
        }
        counters.latencies.push_back(latency);
    }

    /// Stats for one tool (zeroed if never invoked).
    pub fn stats(&self, tool: &str) -> ToolStats {
        self.lock()
            .get(tool)
            .map(Counters::stats)
            .unwrap_or_else(ToolStats::empty)
    }

    /// Clears all counters.
    pub fn reset(&self) {
        self.lock().clear();
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ValidationError;
    use serde_json::json;

    fn ok() -> Result<Value, InvocationError> {
        Ok(json!({}))
    }

    #[test]
    fn counts_successes_failures_and_rejections() {
        let metrics = MetricsRecorder::new(10);
        metrics.record("blast", &ok(), true, Duration::from_millis(10));
        metrics.record(
            "blast",
            &Err(InvocationError::execution("blast", "x")),
            true,
            Duration::from_millis(30),
        );
        metrics.record(
            "blast",
            &Err(InvocationError::validation("blast", ValidationError::missing_field("sequence"))),
            false,
            Duration::ZERO,
        );

        let stats = metrics.stats("blast");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.success_rate, Some(0.5));
        assert_eq!(stats.avg_latency_ms, Some(20.0));
        assert!(stats.last_invoked_at.is_some());
    }

    #[test]
    fn unexecuted_timeout_is_a_rejection() {
        let metrics = MetricsRecorder::new(10);
        metrics.record(
            "blast",
            &Err(InvocationError::timeout("blast", Duration::ZERO)),
            false,
            Duration::ZERO,
        );

        let stats = metrics.stats("blast");
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.avg_latency_ms, None);
    }

    #[test]
    fn latency_window_is_bounded() {
        let metrics = MetricsRecorder::new(2);
        for ms in [100, 10, 20] {
            metrics.record("t", &ok(), true, Duration::from_millis(ms));
        }
        assert_eq!(metrics.stats("t").avg_latency_ms, Some(15.0));
        assert_eq!(metrics.stats("t").total, 3);
    }

    #[test]
    fn unknown_tool_has_empty_stats_and_reset_clears() {
        let metrics = MetricsRecorder::default();
        assert_eq!(metrics.stats("nope").success_rate, None);

        metrics.record("t", &ok(), true, Duration::from_millis(1));
        assert_eq!(metrics.stats("t").total, 1);
        metrics.reset();
        assert_eq!(metrics.stats("t"), ToolStats::empty());
    }
}
