// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fte_core::{Priority, WorkflowState};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn sample_task(path: std::path::PathBuf) -> Task {
    let now = Utc::now();
    Task {
        id: "t1".into(),
        state: WorkflowState::Executing,
        priority: Priority::Medium,
        created_at: now,
        modified_at: now,
        metadata: BTreeMap::new(),
        persistence_loop: None,
        body: "# Task\n".into(),
        file_path: path,
    }
}

#[test]
fn dry_run_succeeds_on_first_iteration_and_resets_checkpoint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t1.md");
    let mut task = sample_task(path.clone());
    TaskStore::new().save(&task, &path).unwrap();

    let invoker = AgentInvoker::new(crate::agent_invoker::AgentInvokerConfig::default());
    let looper = PersistenceLoop::new(PersistenceLoopConfig { max_iterations: 5, dry_run: true }, invoker);
    let outcome = looper.run(&mut task, &path);

    assert!(outcome.result.success);
    assert_eq!(outcome.iterations, 1);
    let checkpoint = task.persistence_loop.as_ref().unwrap();
    assert_eq!(checkpoint.consecutive_retries, 0);
    assert!(checkpoint.last_error.is_none());
}

#[test]
fn hard_failure_returns_immediately_without_retrying() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t1.md");
    let mut task = sample_task(path.clone());
    TaskStore::new().save(&task, &path).unwrap();

    let invoker = AgentInvoker::new(crate::agent_invoker::AgentInvokerConfig {
        binary: "false".to_string(),
        timeout: Duration::from_secs(5),
    });
    let looper = PersistenceLoop::new(PersistenceLoopConfig { max_iterations: 5, dry_run: false }, invoker);
    let outcome = looper.run(&mut task, &path);

    assert!(!outcome.result.success);
    assert_eq!(outcome.iterations, 1);
}

#[test]
fn transient_error_classification_matches_known_patterns() {
    let timeout = InvocationResult { timed_out: true, ..failing_result("") };
    assert_eq!(classify_error_type(&timeout), TransientErrorType::Timeout);

    let rate_limited = failing_result("Error: rate limit exceeded, try again later");
    assert_eq!(classify_error_type(&rate_limited), TransientErrorType::RateLimit);

    let connection = failing_result("connection refused by host");
    assert_eq!(classify_error_type(&connection), TransientErrorType::Connection);

    let unavailable = failing_result("503 service unavailable");
    assert_eq!(classify_error_type(&unavailable), TransientErrorType::ServiceUnavailable);

    let lock = failing_result("lock acquisition failed after 3 tries");
    assert_eq!(classify_error_type(&lock), TransientErrorType::LockContention);

    let generic = failing_result("something broke");
    assert_eq!(classify_error_type(&generic), TransientErrorType::GenericTransient);
    assert!(!is_transient(&generic));
    assert!(is_transient(&rate_limited));
}

#[test]
fn retry_policy_lookup_matches_the_table() {
    let rate_limit = RetryPolicy::for_error_type(TransientErrorType::RateLimit);
    assert_eq!(rate_limit.max_attempts, 4);
    assert_eq!(rate_limit.base_delay, Duration::from_secs_f64(5.0));

    let lock = RetryPolicy::for_error_type(TransientErrorType::LockContention);
    assert_eq!(lock.max_attempts, 5);
    assert_eq!(lock.base_delay, Duration::from_millis(500));
}

#[test]
fn error_message_is_truncated_to_two_hundred_chars() {
    let long = "e".repeat(500);
    assert_eq!(truncate(&long).len(), MAX_ERROR_MESSAGE_LEN);
}

fn failing_result(stderr: &str) -> InvocationResult {
    InvocationResult {
        success: false,
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: 1,
        pid: None,
        duration_seconds: 0.0,
        timed_out: false,
        timestamp: Utc::now(),
    }
}
