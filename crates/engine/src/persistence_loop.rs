// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence loop (C8): retries a transient agent-invocation failure
//! with per-error-type backoff, checkpointing progress into the task's
//! own frontmatter so a restart resumes rather than starts over.

use std::path::Path;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use fte_core::{Task, TaskCheckpoint};
use fte_store::{TaskStore, TaskStoreError};
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::agent_invoker::{AgentInvoker, InvocationResult};

const MAX_ERROR_MESSAGE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum PersistenceLoopError {
    #[error("failed to persist checkpoint: {0}")]
    Checkpoint(#[source] TaskStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientErrorType {
    RateLimit,
    Timeout,
    Connection,
    ServiceUnavailable,
    LockContention,
    GenericTransient,
}

impl TransientErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::ServiceUnavailable => "service_unavailable",
            Self::LockContention => "lock_contention",
            Self::GenericTransient => "generic_transient",
        }
    }
}

#[allow(clippy::expect_used)]
static TRANSIENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)timed?\s*out|rate[\s_-]*limit|503|service\s+unavailable|connection\s+(refused|reset|error)|temporary\s+(error|failure)|try\s+again\s+later|lock\s+(acquisition|timeout)",
    )
    .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static RATE_LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rate[\s_-]*limit").expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static TIMEOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timed?\s*out").expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static CONNECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)connection\s+(refused|reset|error)").expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static SERVICE_UNAVAILABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)503|service\s+unavailable").expect("constant regex pattern is valid"));
#[allow(clippy::expect_used)]
static LOCK_CONTENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)lock\s+(acquisition|timeout)").expect("constant regex pattern is valid"));

fn is_transient(result: &InvocationResult) -> bool {
    result.timed_out || TRANSIENT_PATTERN.is_match(&result.stderr)
}

fn classify_error_type(result: &InvocationResult) -> TransientErrorType {
    if result.timed_out {
        return TransientErrorType::Timeout;
    }
    if RATE_LIMIT_PATTERN.is_match(&result.stderr) {
        TransientErrorType::RateLimit
    } else if TIMEOUT_PATTERN.is_match(&result.stderr) {
        TransientErrorType::Timeout
    } else if CONNECTION_PATTERN.is_match(&result.stderr) {
        TransientErrorType::Connection
    } else if SERVICE_UNAVAILABLE_PATTERN.is_match(&result.stderr) {
        TransientErrorType::ServiceUnavailable
    } else if LOCK_CONTENTION_PATTERN.is_match(&result.stderr) {
        TransientErrorType::LockContention
    } else {
        TransientErrorType::GenericTransient
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs_f64(1.0), max_delay: Duration::from_secs_f64(16.0), jitter: 0.2 }
    }
}

impl RetryPolicy {
    pub fn for_error_type(error_type: TransientErrorType) -> Self {
        match error_type {
            TransientErrorType::RateLimit => Self {
                max_attempts: 4,
                base_delay: Duration::from_secs_f64(5.0),
                max_delay: Duration::from_secs_f64(60.0),
                jitter: 0.2,
            },
            TransientErrorType::Timeout => Self {
                max_attempts: 3,
                base_delay: Duration::from_secs_f64(1.0),
                max_delay: Duration::from_secs_f64(16.0),
                jitter: 0.3,
            },
            TransientErrorType::Connection => Self {
                max_attempts: 4,
                base_delay: Duration::from_secs_f64(2.0),
                max_delay: Duration::from_secs_f64(32.0),
                jitter: 0.2,
            },
            TransientErrorType::ServiceUnavailable => Self {
                max_attempts: 3,
                base_delay: Duration::from_secs_f64(10.0),
                max_delay: Duration::from_secs_f64(120.0),
                jitter: 0.2,
            },
            TransientErrorType::LockContention => Self {
                max_attempts: 5,
                base_delay: Duration::from_secs_f64(0.5),
                max_delay: Duration::from_secs_f64(8.0),
                jitter: 0.4,
            },
            TransientErrorType::GenericTransient => Self::default(),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32 - 1);
        let capped = exp.min(self.max_delay.as_secs_f64());
        let jitter_range = capped * self.jitter;
        let jittered = capped + rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PersistenceLoopConfig {
    pub max_iterations: u32,
    pub dry_run: bool,
}

impl Default for PersistenceLoopConfig {
    fn default() -> Self {
        Self { max_iterations: 100, dry_run: false }
    }
}

/// Outcome of running the loop to completion (success, hard failure, or
/// retry exhaustion).
#[derive(Debug, Clone)]
pub struct PersistenceLoopOutcome {
    pub result: InvocationResult,
    pub iterations: u32,
}

pub struct PersistenceLoop {
    config: PersistenceLoopConfig,
    invoker: AgentInvoker,
    store: TaskStore,
}

impl PersistenceLoop {
    pub fn new(config: PersistenceLoopConfig, invoker: AgentInvoker) -> Self {
        Self { config, invoker, store: TaskStore::new() }
    }

    /// Run the agent against `task`, retrying transient failures with
    /// per-error-type backoff and checkpointing into its frontmatter,
    /// persisting `task` back to `task_path` after every iteration.
    pub fn run(&self, task: &mut Task, task_path: &Path) -> PersistenceLoopOutcome {
        let warn_at = (self.config.max_iterations as f64 * 0.8) as u32;
        let mut checkpoint = task.persistence_loop.clone().unwrap_or_else(|| TaskCheckpoint::fresh(Utc::now()));

        for iteration in 1..=self.config.max_iterations {
            checkpoint.iteration = iteration;
            checkpoint.last_updated = Utc::now();
            if iteration >= warn_at {
                tracing::warn!(task_id = %task.id, iteration, max = self.config.max_iterations, "approaching max_iterations");
            }

            let result = if self.config.dry_run { self.invoker.dry_run(task_path) } else { self.invoker.invoke(task_path) };

            if result.success {
                checkpoint.consecutive_retries = 0;
                checkpoint.last_error = None;
                checkpoint.last_error_type = None;
                self.checkpoint(task, task_path, checkpoint);
                return PersistenceLoopOutcome { result, iterations: iteration };
            }

            if !is_transient(&result) {
                checkpoint.last_error = Some(truncate(&result.stderr));
                self.checkpoint(task, task_path, checkpoint);
                return PersistenceLoopOutcome { result, iterations: iteration };
            }

            let error_type = classify_error_type(&result);
            checkpoint.consecutive_retries += 1;
            checkpoint.last_error = Some(truncate(&result.stderr));
            checkpoint.last_error_type = Some(error_type.as_str().to_string());

            let policy = RetryPolicy::for_error_type(error_type);
            if checkpoint.consecutive_retries >= policy.max_attempts {
                self.checkpoint(task, task_path, checkpoint);
                return PersistenceLoopOutcome { result, iterations: iteration };
            }

            self.checkpoint(task, task_path, checkpoint.clone());
            thread::sleep(policy.backoff(checkpoint.consecutive_retries));
        }

        checkpoint.state_data.insert("max_iterations_exceeded".to_string(), serde_yaml::Value::Bool(true));
        self.checkpoint(task, task_path, checkpoint);
        PersistenceLoopOutcome {
            result: InvocationResult::max_iterations_exceeded(),
            iterations: self.config.max_iterations,
        }
    }

    fn checkpoint(&self, task: &mut Task, task_path: &Path, checkpoint: TaskCheckpoint) {
        task.persistence_loop = Some(checkpoint);
        task.modified_at = Utc::now();
        let _ = self.store.save(task, task_path);
    }
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

#[cfg(test)]
#[path = "persistence_loop_tests.rs"]
mod tests;
