// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent invoker (C9): subprocess wrapper around the configured agent
//! binary. Spawns it with the task file as its sole argument, captures
//! stdout/stderr, enforces a per-invocation timeout, and never panics —
//! every failure mode is folded into [`InvocationResult`].

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of a single agent invocation. Deliberately infallible to
/// construct — the invoker never propagates an `Err`, matching the
/// orchestrator's rule that agent failures are task outcomes, not
/// process crashes.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub pid: Option<u32>,
    pub duration_seconds: f64,
    pub timed_out: bool,
    pub timestamp: DateTime<Utc>,
}

impl InvocationResult {
    fn failure(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: -1,
            pid: None,
            duration_seconds: 0.0,
            timed_out: false,
            timestamp: Utc::now(),
        }
    }

    /// A [`crate::persistence_loop::PersistenceLoop`] exhausted its
    /// iteration budget without a terminal success or hard failure.
    pub fn max_iterations_exceeded() -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: "persistence loop exceeded max_iterations".to_string(),
            exit_code: -2,
            pid: None,
            duration_seconds: 0.0,
            timed_out: false,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentInvokerConfig {
    pub binary: String,
    pub timeout: Duration,
}

impl Default for AgentInvokerConfig {
    fn default() -> Self {
        Self { binary: "claude".to_string(), timeout: Duration::from_secs(3600) }
    }
}

/// Spawns the agent binary and captures the result. Construction never
/// fails; every invocation returns a populated [`InvocationResult`]
/// regardless of whether the binary could even be found.
pub struct AgentInvoker {
    config: AgentInvokerConfig,
}

impl AgentInvoker {
    pub fn new(config: AgentInvokerConfig) -> Self {
        Self { config }
    }

    /// Run `<binary> --no-interactive <task_path>`, waiting up to
    /// `config.timeout` before killing the child and reporting a timeout.
    pub fn invoke(&self, task_path: &Path) -> InvocationResult {
        let start = Instant::now();
        let mut child = match Command::new(&self.config.binary)
            .arg("--no-interactive")
            .arg(task_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return InvocationResult::failure(format!("agent binary not found: {}", self.config.binary));
            }
            Err(e) => return InvocationResult::failure(e.to_string()),
        };
        let pid = child.id();

        match self.wait_with_timeout(&mut child, self.config.timeout) {
            Some(status) => {
                let duration_seconds = start.elapsed().as_secs_f64();
                let output = child.wait_with_output();
                let (stdout, stderr) = match output {
                    Ok(o) => (String::from_utf8_lossy(&o.stdout).into_owned(), String::from_utf8_lossy(&o.stderr).into_owned()),
                    Err(_) => (String::new(), String::new()),
                };
                InvocationResult {
                    success: status.success(),
                    stdout,
                    stderr,
                    exit_code: status.code().unwrap_or(-1),
                    pid: Some(pid),
                    duration_seconds,
                    timed_out: false,
                    timestamp: Utc::now(),
                }
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                InvocationResult {
                    success: false,
                    stdout: String::new(),
                    stderr: format!("agent invocation timed out after {}s", self.config.timeout.as_secs()),
                    exit_code: -1,
                    pid: Some(pid),
                    duration_seconds: start.elapsed().as_secs_f64(),
                    timed_out: true,
                    timestamp: Utc::now(),
                }
            }
        }
    }

    /// Simulate an invocation without running the agent binary; always
    /// succeeds after a short, fixed delay. Used when the orchestrator
    /// runs in dry-run mode.
    pub fn dry_run(&self, task_path: &Path) -> InvocationResult {
        std::thread::sleep(Duration::from_millis(100));
        InvocationResult {
            success: true,
            stdout: format!("[DRY-RUN] Would invoke agent on {}", task_path.display()),
            stderr: String::new(),
            exit_code: 0,
            pid: None,
            duration_seconds: 0.1,
            timed_out: false,
            timestamp: Utc::now(),
        }
    }

    fn wait_with_timeout(&self, child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(status)) = child.try_wait() {
                return Some(status);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
#[path = "agent_invoker_tests.rs"]
mod tests;
