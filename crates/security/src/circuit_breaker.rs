// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker (C12): three-state breaker per outbound server.
//!
//! State transitions and counters are updated under the breaker's lock;
//! the wrapped call itself runs outside the lock so a slow or hung call
//! never blocks other callers from observing the breaker's state.

use std::collections::HashMap;
use std::time::Duration;

use fte_core::{simple_display, Clock};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

simple_display! {
    CircuitState {
        Closed => "closed",
        Open => "open",
        HalfOpen => "half_open",
    }
}

#[derive(Debug, Error)]
#[error("circuit breaker '{name}' is open, retry in {time_until_retry:?}")]
pub struct CircuitOpenError {
    pub name: String,
    pub time_until_retry: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreakerStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub state_transitions: u64,
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_calls: u32,
    last_failure_ms: Option<u64>,
    stats: CircuitBreakerStats,
}

/// Configuration for one breaker instance.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
            success_threshold: 2,
        }
    }
}

/// A single named breaker. `call` executes `f` only if the breaker
/// currently admits calls, recording the outcome afterward.
pub struct CircuitBreaker<C: Clock> {
    name: String,
    config: CircuitBreakerConfig,
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig, clock: C) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_calls: 0,
                last_failure_ms: None,
                stats: CircuitBreakerStats::default(),
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        self.inner.lock().stats
    }

    fn should_attempt(&self, inner: &mut Inner) -> Result<(), CircuitOpenError> {
        let now_ms = self.clock.epoch_ms();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed_ms = inner
                    .last_failure_ms
                    .map(|last| now_ms.saturating_sub(last))
                    .unwrap_or(u64::MAX);
                if elapsed_ms >= self.config.recovery_timeout.as_millis() as u64 {
                    self.transition_to(inner, CircuitState::HalfOpen);
                    Ok(())
                } else {
                    inner.stats.rejected_calls += 1;
                    let remaining_ms = self.config.recovery_timeout.as_millis() as u64 - elapsed_ms;
                    Err(CircuitOpenError {
                        name: self.name.clone(),
                        time_until_retry: Duration::from_millis(remaining_ms),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    Ok(())
                } else {
                    inner.stats.rejected_calls += 1;
                    Err(CircuitOpenError { name: self.name.clone(), time_until_retry: Duration::ZERO })
                }
            }
        }
    }

    fn transition_to(&self, inner: &mut Inner, target: CircuitState) {
        inner.stats.state_transitions += 1;
        if target == CircuitState::HalfOpen {
            inner.half_open_calls = 0;
            inner.success_count = 0;
        }
        if target == CircuitState::Closed {
            inner.failure_count = 0;
        }
        inner.state = target;
    }

    fn record_success(&self, inner: &mut Inner) {
        inner.stats.successful_calls += 1;
        inner.failure_count = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_calls += 1;
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                self.transition_to(inner, CircuitState::Closed);
            }
        }
    }

    fn record_failure(&self, inner: &mut Inner) {
        inner.stats.failed_calls += 1;
        inner.success_count = 0;
        inner.last_failure_ms = Some(self.clock.epoch_ms());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition_to(inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to(inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Run `f` through the breaker. Rejects immediately (without running
    /// `f`) when the breaker is open or the half-open probe budget is
    /// exhausted.
    pub fn call<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, CallError<E>> {
        {
            let mut inner = self.inner.lock();
            inner.stats.total_calls += 1;
            self.should_attempt(&mut inner).map_err(CallError::Open)?;
        }
        match f() {
            Ok(value) => {
                self.record_success(&mut self.inner.lock());
                Ok(value)
            }
            Err(err) => {
                self.record_failure(&mut self.inner.lock());
                Err(CallError::Inner(err))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error(transparent)]
    Open(CircuitOpenError),
    #[error("wrapped call failed: {0}")]
    Inner(E),
}

/// Name -> breaker map, mirroring the per-server breaker registry the
/// security gate looks up by `mcp:<server>`.
pub struct CircuitBreakerRegistry<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
    breakers: Mutex<HashMap<String, std::sync::Arc<CircuitBreaker<C>>>>,
}

impl<C: Clock> CircuitBreakerRegistry<C> {
    pub fn new(config: CircuitBreakerConfig, clock: C) -> Self {
        Self { config, clock, breakers: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, name: &str) -> std::sync::Arc<CircuitBreaker<C>> {
        let mut breakers = self.breakers.lock();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                std::sync::Arc::new(CircuitBreaker::new(name.to_string(), self.config, self.clock.clone()))
            })
            .clone()
    }
}

#[cfg(test)]
#[path = "circuit_breaker_tests.rs"]
mod tests;
