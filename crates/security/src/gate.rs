// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security gate (C13): composition of the audit log, rate limiter, and
//! circuit-breaker registry around every outbound call to an external
//! capability server.

use std::sync::Arc;

use fte_core::Clock;
use fte_store::AuditLog;
use thiserror::Error;

use crate::circuit_breaker::{CallError, CircuitBreakerRegistry};
use crate::rate_limiter::{RateLimiter, RateLimiterError};

/// Call-site context threaded through for audit purposes; mirrors the
/// approval metadata an approved action carries.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub approved: bool,
    pub risk_level: Option<String>,
    pub approval_id: Option<String>,
    pub nonce: Option<String>,
}

#[derive(Debug, Error)]
pub enum SecurityGateError<E> {
    #[error("rate limit exceeded calling {server}/{action_type}: {source}")]
    RateLimited {
        server: String,
        action_type: String,
        #[source]
        source: RateLimiterError,
    },
    #[error("circuit open for {server}/{action_type}")]
    CircuitOpen { server: String, action_type: String },
    #[error("call to {server}/{action_type} failed: {0}")]
    CallFailed(E),
}

/// Constructed once and injected wherever an outbound capability call is
/// made, per the composition-over-decoration re-architecture note.
pub struct SecurityGate<C: Clock> {
    rate_limiter: Arc<RateLimiter<C>>,
    breakers: Arc<CircuitBreakerRegistry<C>>,
    audit: Arc<AuditLog>,
    clock: C,
}

impl<C: Clock> SecurityGate<C> {
    pub fn new(rate_limiter: Arc<RateLimiter<C>>, breakers: Arc<CircuitBreakerRegistry<C>>, audit: Arc<AuditLog>, clock: C) -> Self {
        Self { rate_limiter, breakers, audit, clock }
    }

    fn log(&self, server: &str, action_type: &str, result: &str, duration_ms: Option<u64>, ctx: &CallContext) {
        let _ = self.audit.append(
            "mcp_action",
            &serde_json::json!({
                "server": server,
                "action_type": action_type,
                "result": result,
                "duration_ms": duration_ms,
                "approved": ctx.approved,
                "risk_level": ctx.risk_level,
                "approval_id": ctx.approval_id,
                "nonce": ctx.nonce,
            }),
        );
    }

    /// Consume a rate-limit token, run `f` through the per-server
    /// circuit breaker, and audit the outcome regardless of how it ends.
    /// `ctx` carries the approval metadata of the action being gated, so
    /// the audit trail ties an outbound call back to the HITL record
    /// that authorized it.
    pub fn call<T, E>(
        &self,
        server: &str,
        action_type: &str,
        ctx: &CallContext,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, SecurityGateError<E>> {
        if let Err(source) = self.rate_limiter.consume(server, action_type, 1.0) {
            self.log(server, action_type, "rate_limit_exceeded", None, ctx);
            return Err(SecurityGateError::RateLimited {
                server: server.to_string(),
                action_type: action_type.to_string(),
                source,
            });
        }

        let breaker = self.breakers.get(&format!("mcp:{server}"));
        let start_ms = self.clock.epoch_ms();
        match breaker.call(f) {
            Ok(value) => {
                let elapsed = self.clock.epoch_ms().saturating_sub(start_ms);
                self.log(server, action_type, "success", Some(elapsed), ctx);
                Ok(value)
            }
            Err(CallError::Open(_)) => {
                self.log(server, action_type, "circuit_open", None, ctx);
                Err(SecurityGateError::CircuitOpen { server: server.to_string(), action_type: action_type.to_string() })
            }
            Err(CallError::Inner(err)) => {
                let elapsed = self.clock.epoch_ms().saturating_sub(start_ms);
                self.log(server, action_type, "error", Some(elapsed), ctx);
                Err(SecurityGateError::CallFailed(err))
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
