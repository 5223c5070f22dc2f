//! Per-provider circuit breaker: opens after repeated failures, probes
//! after a cooldown, and closes again once the probes succeed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 5 consecutive failures open the circuit; a 30s cooldown elapses
/// before a probe is allowed through; 2 consecutive probe successes
/// close it again.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a probe.
    pub cooldown: Duration,
    /// Consecutive probe successes required to close the circuit again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

/// Tracks one provider's health and decides whether a call may proceed.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Why a call was refused before it was even attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenError;

impl std::fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circuit breaker is open")
    }
}

impl std::error::Error for CircuitOpenError {}

impl CircuitBreaker {
    /// Build a breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    /// Call `before_call` before attempting a provider request. Returns
    /// an error when the circuit is open and the cooldown has not
    /// elapsed.
    pub fn before_call(&self, now: Instant) -> Result<(), CircuitOpenError> {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            State::Closed => Ok(()),
            State::HalfOpen => Ok(()),
            State::Open => {
                let opened_at = inner.opened_at.expect("open state always has opened_at");
                if now.duration_since(opened_at) >= self.config.cooldown {
                    inner.state = State::HalfOpen;
                    inner.consecutive_successes = 0;
                    Ok(())
                } else {
                    Err(CircuitOpenError)
                }
            }
        }
    }

    /// Record that the most recent call (permitted by `before_call`)
    /// succeeded.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        inner.consecutive_failures = 0;
        match inner.state {
            State::Closed => {}
            State::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = State::Closed;
                    inner.opened_at = None;
                }
            }
            State::Open => {}
        }
    }

    /// Record that the most recent call failed, stamping the open time
    /// with `now` if this failure trips the breaker.
    pub fn record_failure(&self, now: Instant) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(now);
                inner.consecutive_successes = 0;
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(now);
                }
            }
            State::Open => {}
        }
    }

    /// Whether the breaker is currently refusing calls outright.
    pub fn is_open(&self, now: Instant) -> bool {
        let inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        matches!(inner.state, State::Open)
            && inner
                .opened_at
                .is_some_and(|t| now.duration_since(t) < self.config.cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let now = Instant::now();
        for _ in 0..4 {
            breaker.record_failure(now);
            assert!(!breaker.is_open(now));
        }
        breaker.record_failure(now);
        assert!(breaker.is_open(now));
    }

    #[test]
    fn refuses_calls_while_open() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let now = Instant::now();
        for _ in 0..5 {
            breaker.record_failure(now);
        }
        assert!(breaker.before_call(now).is_err());
    }

    #[test]
    fn allows_probe_after_cooldown_and_closes_on_successes() {
        let config = CircuitBreakerConfig {
            cooldown: Duration::from_millis(10),
            ..Default::default()
        };
        let breaker = CircuitBreaker::new(config);
        let t0 = Instant::now();
        for _ in 0..5 {
            breaker.record_failure(t0);
        }
        let t1 = t0 + Duration::from_millis(20);
        assert!(breaker.before_call(t1).is_ok());
        breaker.record_success();
        assert!(breaker.before_call(t1).is_ok());
        breaker.record_success();
        assert!(!breaker.is_open(t1));
    }

    #[test]
    fn probe_failure_reopens_circuit() {
        let config = CircuitBreakerConfig {
            cooldown: Duration::from_millis(10),
            ..Default::default()
        };
        let breaker = CircuitBreaker::new(config);
        let t0 = Instant::now();
        for _ in 0..5 {
            breaker.record_failure(t0);
        }
        let t1 = t0 + Duration::from_millis(20);
        breaker.before_call(t1).unwrap();
        breaker.record_failure(t1);
        assert!(breaker.is_open(t1));
    }
}
