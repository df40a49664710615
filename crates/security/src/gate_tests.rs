// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::circuit_breaker::CircuitBreakerConfig;
use fte_core::FakeClock;
use fte_store::AuditLog;
use tempfile::tempdir;

fn make_gate(dir: &std::path::Path) -> SecurityGate<FakeClock> {
    let clock = FakeClock::new();
    let rate_limiter = Arc::new(RateLimiter::new(dir.join("rate_limits.json"), clock.clone()));
    let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default(), clock.clone()));
    let audit = Arc::new(AuditLog::new(dir.join("audit.jsonl")));
    SecurityGate::new(rate_limiter, breakers, audit, clock)
}

#[test]
fn successful_call_logs_success_and_returns_value() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let ctx = CallContext::default();
    let result = gate.call("github", "deploy", &ctx, || Ok::<_, &str>(7));
    assert_eq!(result.unwrap(), 7);

    let records = gate.audit.read_all().unwrap();
    assert_eq!(records.last().unwrap().event_type, "mcp_action");
    assert_eq!(records.last().unwrap().fields["result"], "success");
}

#[test]
fn rate_limit_exceeded_short_circuits_before_calling_fn() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let ctx = CallContext::default();
    // deploy allows 2/min -> 20/hr; exhaust it.
    for _ in 0..20 {
        let _ = gate.call("github", "deploy", &ctx, || Ok::<_, &str>(1));
    }
    let mut ran = false;
    let result = gate.call("github", "deploy", &ctx, || {
        ran = true;
        Ok::<_, &str>(1)
    });
    assert!(!ran);
    assert!(matches!(result, Err(SecurityGateError::RateLimited { .. })));
}

#[test]
fn failing_call_is_logged_with_error_result() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let ctx = CallContext::default();
    let result = gate.call("github", "deploy", &ctx, || Err::<i32, _>("boom"));
    assert!(matches!(result, Err(SecurityGateError::CallFailed("boom"))));

    let records = gate.audit.read_all().unwrap();
    assert_eq!(records.last().unwrap().fields["result"], "error");
}
