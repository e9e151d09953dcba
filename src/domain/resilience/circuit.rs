//! Circuit breaker state machine.
//!
//! ```text
//! Closed   --[failure_threshold consecutive failures]--> Open
//! Open     --[recovery_timeout elapsed, next attempt]--> HalfOpen
//! HalfOpen --[probe succeeds]--> Closed
//! HalfOpen --[probe fails]-----> Open (recovery timer restarts)
//! ```
//!
//! The machine is pure: callers pass the current instant, and take care of
//! locking. Exactly one probe is admitted while half-open.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - invocations flow through.
    Closed,

    /// Too many failures - invocations rejected without calling the tool.
    Open,

    /// Recovery probe in progress or pending.
    HalfOpen,
}

impl CircuitState {
    /// Check if the circuit lets invocations reach the tool.
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Breaker tuning for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive execution failures before opening.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// Time spent open before the next attempt becomes a probe.
    ///
    /// Default: 30 seconds
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
        }
    }
}

/// Admission granted by the breaker. The holder must report back exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CallPermit {
    /// Ordinary call while closed.
    Normal,
    /// The single recovery probe while half-open.
    Probe,
}

/// Rejection returned while the breaker is open or a probe is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit open, retry after {retry_after:?}")]
pub struct CircuitOpen {
    pub retry_after: Duration,
}

/// State change caused by an admission or an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitTransition {
    /// Closed to open after consecutive failures.
    Opened { consecutive_failures: u32 },
    /// Open to half-open; a probe was admitted.
    HalfOpened,
    /// Half-open probe failed; back to open.
    Reopened,
    /// Probe succeeded or operator reset.
    Closed,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    #[serde(rename = "recovery_timeout_ms", serialize_with = "millis")]
    pub recovery_timeout: Duration,
    /// Time until the next attempt is admitted as a probe (when open).
    #[serde(rename = "retry_after_ms", serialize_with = "opt_millis")]
    pub retry_after: Option<Duration>,
    #[serde(rename = "since_transition_ms", serialize_with = "millis")]
    pub since_transition: Duration,
    pub probe_in_flight: bool,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
    pub times_opened: u64,
}

fn millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn opt_millis<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}

/// Breaker state for exactly one tool.
#[derive(Debug, Clone)]
pub struct CircuitStateMachine {
    config: CircuitBreakerConfig,
    state: CircuitState,
    consecutive_failures: u32,
    last_transition: Instant,
    probe_in_flight: bool,
    total_successes: u64,
    total_failures: u64,
    total_rejections: u64,
    times_opened: u64,
}

impl CircuitStateMachine {
    pub fn new(config: CircuitBreakerConfig, now: Instant) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_transition: now,
            probe_in_flight: false,
            total_successes: 0,
            total_failures: 0,
            total_rejections: 0,
            times_opened: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Decides whether a call may proceed.
    ///
    /// An open breaker whose recovery timeout has elapsed moves to half-open
    /// and admits the caller as the probe. While the probe is outstanding
    /// every other caller is rejected.
    pub fn try_acquire(
        &mut self,
        now: Instant,
    ) -> Result<(CallPermit, Option<CircuitTransition>), CircuitOpen> {
        match self.state {
            CircuitState::Closed => Ok((CallPermit::Normal, None)),
            CircuitState::Open => {
                let elapsed = now.saturating_duration_since(self.last_transition);
                if elapsed >= self.config.recovery_timeout {
                    self.transition(CircuitState::HalfOpen, now);
                    self.probe_in_flight = true;
                    Ok((CallPermit::Probe, Some(CircuitTransition::HalfOpened)))
                } else {
                    self.total_rejections += 1;
                    Err(CircuitOpen {
                        retry_after: self.config.recovery_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    self.total_rejections += 1;
                    Err(CircuitOpen {
                        retry_after: Duration::ZERO,
                    })
                } else {
                    self.probe_in_flight = true;
                    Ok((CallPermit::Probe, None))
                }
            }
        }
    }

    /// Records a successful execution.
    pub fn on_success(&mut self, permit: CallPermit, now: Instant) -> Option<CircuitTransition> {
        self.total_successes += 1;
        match (permit, self.state) {
            (CallPermit::Probe, CircuitState::HalfOpen) => {
                self.probe_in_flight = false;
                self.consecutive_failures = 0;
                self.transition(CircuitState::Closed, now);
                Some(CircuitTransition::Closed)
            }
            (CallPermit::Probe, _) => {
                self.probe_in_flight = false;
                if self.state == CircuitState::Closed {
                    self.consecutive_failures = 0;
                }
                None
            }
            (CallPermit::Normal, CircuitState::Closed) => {
                self.consecutive_failures = 0;
                None
            }
            // Late result of a call admitted before the breaker opened.
            (CallPermit::Normal, _) => None,
        }
    }

    /// Records an execution failure (adapter error or timeout).
    pub fn on_failure(&mut self, permit: CallPermit, now: Instant) -> Option<CircuitTransition> {
        self.total_failures += 1;
        match (permit, self.state) {
            (CallPermit::Probe, CircuitState::HalfOpen) => {
                self.probe_in_flight = false;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.open(now);
                Some(CircuitTransition::Reopened)
            }
            (permit, CircuitState::Closed) => {
                if permit == CallPermit::Probe {
                    self.probe_in_flight = false;
                }
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.open(now);
                    Some(CircuitTransition::Opened {
                        consecutive_failures: self.consecutive_failures,
                    })
                } else {
                    None
                }
            }
            (permit, _) => {
                if permit == CallPermit::Probe {
                    self.probe_in_flight = false;
                }
                None
            }
        }
    }

    /// Returns a permit whose call ended without a verdict on tool health
    /// (caller-side validation error or cancellation).
    pub fn release_neutral(&mut self, permit: CallPermit) {
        if permit == CallPermit::Probe {
            self.probe_in_flight = false;
        }
    }

    /// Operator reset: closed, counter zeroed.
    pub fn reset(&mut self, now: Instant) -> Option<CircuitTransition> {
        let was = self.state;
        self.consecutive_failures = 0;
        self.probe_in_flight = false;
        if was == CircuitState::Closed {
            return None;
        }
        self.transition(CircuitState::Closed, now);
        Some(CircuitTransition::Closed)
    }

    pub fn snapshot(&self, now: Instant) -> CircuitSnapshot {
        let since_transition = now.saturating_duration_since(self.last_transition);
        let retry_after = match self.state {
            CircuitState::Open => Some(self.config.recovery_timeout.saturating_sub(since_transition)),
            _ => None,
        };
        CircuitSnapshot {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout: self.config.recovery_timeout,
            retry_after,
            since_transition,
            probe_in_flight: self.probe_in_flight,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_rejections: self.total_rejections,
            times_opened: self.times_opened,
        }
    }

    fn open(&mut self, now: Instant) {
        self.times_opened += 1;
        self.transition(CircuitState::Open, now);
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        self.state = to;
        self.last_transition = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(threshold: u32, recovery_secs: u64) -> (CircuitStateMachine, Instant) {
        let now = Instant::now();
        let config = CircuitBreakerConfig::new(threshold, Duration::from_secs(recovery_secs));
        (CircuitStateMachine::new(config, now), now)
    }

    fn fail(m: &mut CircuitStateMachine, now: Instant) -> Option<CircuitTransition> {
        let (permit, _) = m.try_acquire(now).unwrap();
        m.on_failure(permit, now)
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let (mut m, now) = machine(3, 5);

        assert_eq!(fail(&mut m, now), None);
        assert_eq!(fail(&mut m, now), None);
        assert_eq!(
            fail(&mut m, now),
            Some(CircuitTransition::Opened {
                consecutive_failures: 3
            })
        );
        assert_eq!(m.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_failure_counter() {
        let (mut m, now) = machine(3, 5);
        fail(&mut m, now);
        fail(&mut m, now);

        let (permit, _) = m.try_acquire(now).unwrap();
        m.on_success(permit, now);
        assert_eq!(m.consecutive_failures(), 0);

        fail(&mut m, now);
        assert_eq!(m.state(), CircuitState::Closed);
    }

    #[test]
    fn open_rejects_until_recovery_timeout() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        let err = m.try_acquire(now + Duration::from_secs(2)).unwrap_err();
        assert_eq!(err.retry_after, Duration::from_secs(3));
        assert_eq!(m.snapshot(now).total_rejections, 1);
    }

    #[test]
    fn admits_exactly_one_probe_after_recovery() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        let later = now + Duration::from_secs(5);
        let (permit, transition) = m.try_acquire(later).unwrap();
        assert_eq!(permit, CallPermit::Probe);
        assert_eq!(transition, Some(CircuitTransition::HalfOpened));
        assert_eq!(m.state(), CircuitState::HalfOpen);

        assert!(m.try_acquire(later).is_err());
        assert!(m.try_acquire(later).is_err());
    }

    #[test]
    fn probe_success_closes() {
        let (mut m, now) = machine(2, 5);
        fail(&mut m, now);
        fail(&mut m, now);

        let later = now + Duration::from_secs(6);
        let (permit, _) = m.try_acquire(later).unwrap();
        assert_eq!(m.on_success(permit, later), Some(CircuitTransition::Closed));
        assert_eq!(m.state(), CircuitState::Closed);
        assert_eq!(m.consecutive_failures(), 0);
        assert_eq!(m.try_acquire(later).unwrap().0, CallPermit::Normal);
    }

    #[test]
    fn probe_failure_reopens_and_restarts_timer() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        let probe_at = now + Duration::from_secs(5);
        let (permit, _) = m.try_acquire(probe_at).unwrap();
        assert_eq!(m.on_failure(permit, probe_at), Some(CircuitTransition::Reopened));
        assert_eq!(m.state(), CircuitState::Open);

        assert!(m.try_acquire(probe_at + Duration::from_secs(4)).is_err());
        assert!(m.try_acquire(probe_at + Duration::from_secs(5)).is_ok());
        assert_eq!(m.snapshot(probe_at).times_opened, 2);
    }

    #[test]
    fn neutral_release_frees_probe_slot_without_transition() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        let later = now + Duration::from_secs(5);
        let (permit, _) = m.try_acquire(later).unwrap();
        m.release_neutral(permit);

        assert_eq!(m.state(), CircuitState::HalfOpen);
        assert_eq!(m.try_acquire(later).unwrap().0, CallPermit::Probe);
    }

    #[test]
    fn late_failures_while_open_do_not_extend_recovery() {
        let (mut m, now) = machine(1, 5);
        let (late, _) = m.try_acquire(now).unwrap();
        fail(&mut m, now);

        assert_eq!(m.on_failure(late, now + Duration::from_secs(3)), None);
        assert!(m.try_acquire(now + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn reset_closes_and_reports_transition_once() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        assert_eq!(m.reset(now), Some(CircuitTransition::Closed));
        assert_eq!(m.reset(now), None);
        assert_eq!(m.state(), CircuitState::Closed);
    }

    #[test]
    fn snapshot_reports_retry_after_when_open() {
        let (mut m, now) = machine(1, 5);
        fail(&mut m, now);

        let snap = m.snapshot(now + Duration::from_secs(1));
        assert_eq!(snap.retry_after, Some(Duration::from_secs(4)));
        assert_eq!(snap.state.to_string(), "OPEN");
    }
}
