// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fte_core::FakeClock;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn bucket_starts_full_and_consume_decrements() {
    let dir = tempdir().unwrap();
    let limiter = RateLimiter::new(dir.path().join("rate_limits.json"), FakeClock::new());
    let before = limiter.remaining("gh", "deploy");
    assert_eq!(before, 20.0);
    limiter.consume("gh", "deploy", 1.0).unwrap();
    assert_eq!(limiter.remaining("gh", "deploy"), 19.0);
}

#[test]
fn consume_fails_when_bucket_is_empty() {
    let dir = tempdir().unwrap();
    let limiter = RateLimiter::new(dir.path().join("rate_limits.json"), FakeClock::new());
    for _ in 0..20 {
        limiter.consume("gh", "deploy", 1.0).unwrap();
    }
    let result = limiter.consume("gh", "deploy", 1.0);
    assert!(matches!(result, Err(RateLimiterError::Exceeded { .. })));
}

#[test]
fn refill_accrues_tokens_over_time() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(dir.path().join("rate_limits.json"), clock.clone());
    for _ in 0..20 {
        limiter.consume("gh", "deploy", 1.0).unwrap();
    }
    assert_eq!(limiter.remaining("gh", "deploy"), 0.0);

    // deploy refills at 2/min => 1 token every 30s
    clock.advance(Duration::from_secs(30));
    assert!(limiter.remaining("gh", "deploy") >= 1.0);
}

#[test]
fn unknown_action_type_falls_back_to_default_limit() {
    let dir = tempdir().unwrap();
    let limiter = RateLimiter::new(dir.path().join("rate_limits.json"), FakeClock::new());
    assert_eq!(limiter.remaining("gh", "unlisted"), 3600.0);
}

#[test]
fn separate_servers_have_independent_buckets() {
    let dir = tempdir().unwrap();
    let limiter = RateLimiter::new(dir.path().join("rate_limits.json"), FakeClock::new());
    limiter.consume("gh", "payment", 1.0).unwrap();
    assert_eq!(limiter.remaining("gh", "payment"), 9.0);
    assert_eq!(limiter.remaining("gitlab", "payment"), 10.0);
}
