// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler (C14): the whole-loop driver. Each sweep discovers scored
//! tasks in `Needs_Action`, drives every one through the state machine,
//! approval gate, and persistence loop until it reaches `Done` or
//! `Rejected`, then resumes anything parked in `Approvals` whose
//! approval has since been granted.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fte_core::{Actor, VaultLayout, WorkflowState};
use fte_engine::{
    AgentInvoker, AgentInvokerConfig, ApprovalGate, ApprovalGateConfig, PersistenceLoop, PersistenceLoopConfig,
    PriorityScorer, PriorityScorerConfig, StateMachine,
};
use fte_store::{AuditLog, NonceRegister, TaskStore};
use fte_approval::ApprovalManager;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SchedulerConfig;

const MAX_EXIT_LOG_ENTRIES: usize = 200;
const MAX_ERROR_HEAD_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("checkpoint serialization failed: {0}")]
    Checkpoint(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub last_sweep_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitLogEntry {
    pub task: String,
    pub reason: String,
    pub success: bool,
    pub final_state: WorkflowState,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchedulerCheckpoint {
    last_iteration: u64,
    started_at: DateTime<Utc>,
    exit_log: VecDeque<ExitLogEntry>,
    stop_hook_set: bool,
}

/// Outcome of a single [`Scheduler::run_once`] sweep.
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub stopped: bool,
    pub exit_log: Vec<ExitLogEntry>,
    pub metrics: MetricsSnapshot,
}

pub struct Scheduler {
    layout: VaultLayout,
    audit: Arc<AuditLog>,
    store: TaskStore,
    scorer: PriorityScorer,
    state_machine: StateMachine,
    approval_gate: ApprovalGate,
    persistence_loop: PersistenceLoop,
    stop_hook_file: String,
    poll_interval: Duration,
    iteration: Mutex<u64>,
    started_at: DateTime<Utc>,
    exit_log: Mutex<VecDeque<ExitLogEntry>>,
    metrics: Mutex<MetricsSnapshot>,
}

impl Scheduler {
    pub fn new(layout: VaultLayout, config: &SchedulerConfig) -> Self {
        let audit = Arc::new(AuditLog::new(layout.audit_log_path()));
        let nonces = Arc::new(NonceRegister::new(layout.nonce_ledger_path()));
        let approvals_dir = layout.dir_for(WorkflowState::PendingApproval);
        let manager = ApprovalManager::new(approvals_dir.clone(), nonces, audit.clone());

        let scorer_config = PriorityScorerConfig {
            urgency_weight: config.urgency_weight,
            deadline_weight: config.deadline_weight,
            sender_weight: config.sender_weight,
            vip_senders: config.vip_senders.clone(),
        };
        let gate_config = ApprovalGateConfig {
            keywords: config.approval_keywords.clone(),
            allow_legacy_fallback: config.allow_legacy_approval_fallback,
        };
        let invoker = AgentInvoker::new(AgentInvokerConfig {
            binary: config.agent_binary.clone(),
            timeout: Duration::from_secs(config.agent_timeout_secs),
        });

        Self {
            state_machine: StateMachine::new(audit.clone()),
            approval_gate: ApprovalGate::new(gate_config, approvals_dir, manager),
            persistence_loop: PersistenceLoop::new(
                PersistenceLoopConfig { max_iterations: config.max_iterations, dry_run: config.dry_run },
                invoker,
            ),
            scorer: PriorityScorer::new(scorer_config),
            store: TaskStore::new(),
            stop_hook_file: config.stop_hook_file.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            iteration: Mutex::new(0),
            started_at: Utc::now(),
            exit_log: Mutex::new(VecDeque::new()),
            metrics: Mutex::new(MetricsSnapshot::default()),
            audit,
            layout,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.lock().clone()
    }

    fn stop_hook_path(&self) -> PathBuf {
        self.layout.stop_hook_path(&self.stop_hook_file)
    }

    fn stop_hook_set(&self) -> bool {
        self.stop_hook_path().exists()
    }

    /// Run one discovery-score-execute sweep, then resume anything in
    /// `Approvals/` whose approval has since been granted, then persist
    /// the scheduler checkpoint.
    pub fn run_once(&self) -> Result<SweepSummary, SchedulerError> {
        let sweep_start = Instant::now();
        *self.iteration.lock() += 1;

        if self.stop_hook_set() {
            info!("stop hook set, persisting checkpoint and exiting sweep");
            self.persist_checkpoint(true)?;
            return Ok(SweepSummary { stopped: true, exit_log: Vec::new(), metrics: self.metrics() });
        }

        let mut this_sweep = Vec::new();

        for task_path in self.discover_scored() {
            if self.stop_hook_set() {
                info!("stop hook appeared mid-sweep, finishing in-flight task only");
                break;
            }
            this_sweep.push(self.process_new_task(&task_path));
        }

        for task_path in self.discover_approved() {
            if self.stop_hook_set() {
                break;
            }
            this_sweep.push(self.resume_task(&task_path));
        }

        {
            let mut metrics = self.metrics.lock();
            for entry in &this_sweep {
                metrics.tasks_started += 1;
                if entry.success {
                    metrics.tasks_completed += 1;
                } else {
                    metrics.tasks_failed += 1;
                }
            }
            metrics.last_sweep_duration_secs = sweep_start.elapsed().as_secs_f64();
        }

        {
            let mut log = self.exit_log.lock();
            for entry in &this_sweep {
                log.push_back(entry.clone());
            }
            while log.len() > MAX_EXIT_LOG_ENTRIES {
                log.pop_front();
            }
        }

        info!(tasks = this_sweep.len(), duration_secs = sweep_start.elapsed().as_secs_f64(), "sweep complete");
        self.persist_checkpoint(false)?;

        Ok(SweepSummary { stopped: false, exit_log: this_sweep, metrics: self.metrics() })
    }

    /// Sweep forever on `poll_interval`, until the stop hook halts a sweep.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        loop {
            let summary = self.run_once()?;
            if summary.stopped {
                self.audit.append(
                    "orchestrator_stopped",
                    &serde_json::json!({"reason": "stop_hook"}),
                )
                .ok();
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn discover_scored(&self) -> Vec<PathBuf> {
        let dir = self.layout.dir_for(WorkflowState::NeedsAction);
        let mut scored: Vec<(f64, PathBuf)> = Vec::new();
        let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            match self.scorer.score(&path) {
                Ok(score) => scored.push((score, path)),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to score task, skipping this sweep"),
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, path)| path).collect()
    }

    fn discover_approved(&self) -> Vec<PathBuf> {
        let dir = self.layout.dir_for(WorkflowState::PendingApproval);
        let Ok(entries) = std::fs::read_dir(&dir) else { return Vec::new() };
        let mut out = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name.starts_with("APR-") || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Ok(task) = self.store.load(&path) else { continue };
            if self.approval_gate.is_approved(&task.id).unwrap_or(false) {
                out.push(path);
            }
        }
        out
    }

    fn process_new_task(&self, path: &Path) -> ExitLogEntry {
        let start = Instant::now();
        let mut task = match self.store.load(path) {
            Ok(task) => task,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load discovered task");
                return ExitLogEntry {
                    task: path.display().to_string(),
                    reason: "load_error".to_string(),
                    success: false,
                    final_state: WorkflowState::NeedsAction,
                    duration_secs: start.elapsed().as_secs_f64(),
                    timestamp: Utc::now(),
                };
            }
        };

        if let Err(e) = self.state_machine.transition(&mut task, &self.layout, WorkflowState::Planning, "discovered", Actor::System) {
            return self.transition_failure(&task, e, start);
        }

        if self.approval_gate.requires_approval(&task.body) {
            let approved = self.approval_gate.is_approved(&task.id).unwrap_or(false);
            if !approved {
                let keywords = self.approval_gate.matched_keywords(&task.body);
                if let Err(e) = self.approval_gate.create_approval_request(path, &task.body) {
                    warn!(task_id = %task.id, error = %e, "failed to create approval request");
                }
                let _ = self.audit.append(
                    "approval_requested",
                    &serde_json::json!({"task_id": task.id, "keywords": keywords}),
                );
                if let Err(e) =
                    self.state_machine.transition(&mut task, &self.layout, WorkflowState::PendingApproval, "requires approval", Actor::System)
                {
                    return self.transition_failure(&task, e, start);
                }
                return ExitLogEntry {
                    task: task.name().into_owned(),
                    reason: "pending_approval".to_string(),
                    success: true,
                    final_state: task.state,
                    duration_secs: start.elapsed().as_secs_f64(),
                    timestamp: Utc::now(),
                };
            }
        }

        self.execute(task, start)
    }

    fn resume_task(&self, path: &Path) -> ExitLogEntry {
        let start = Instant::now();
        let mut task = match self.store.load(path) {
            Ok(task) => task,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load approved task for resume");
                return ExitLogEntry {
                    task: path.display().to_string(),
                    reason: "load_error".to_string(),
                    success: false,
                    final_state: WorkflowState::PendingApproval,
                    duration_secs: start.elapsed().as_secs_f64(),
                    timestamp: Utc::now(),
                };
            }
        };
        self.execute(task, start)
    }

    fn execute(&self, mut task: fte_core::Task, start: Instant) -> ExitLogEntry {
        if let Err(e) = self.state_machine.transition(&mut task, &self.layout, WorkflowState::Executing, "approved, executing", Actor::System) {
            return self.transition_failure(&task, e, start);
        }

        let task_path = task.file_path.clone();
        let outcome = self.persistence_loop.run(&mut task, &task_path);

        if outcome.result.success {
            let reason = if outcome.result.stdout.starts_with("[DRY-RUN]") { "dry_run" } else { "done" };
            if let Err(e) = self.state_machine.transition(&mut task, &self.layout, WorkflowState::Done, reason, Actor::System) {
                return self.transition_failure(&task, e, start);
            }
            ExitLogEntry {
                task: task.name().into_owned(),
                reason: reason.to_string(),
                success: true,
                final_state: task.state,
                duration_secs: start.elapsed().as_secs_f64(),
                timestamp: Utc::now(),
            }
        } else {
            let head: String = outcome.result.stderr.chars().take(MAX_ERROR_HEAD_LEN).collect();
            if let Err(e) = self.state_machine.transition(&mut task, &self.layout, WorkflowState::Rejected, &head, Actor::System) {
                return self.transition_failure(&task, e, start);
            }
            ExitLogEntry {
                task: task.name().into_owned(),
                reason: format!("hard_failure: {head}"),
                success: false,
                final_state: task.state,
                duration_secs: start.elapsed().as_secs_f64(),
                timestamp: Utc::now(),
            }
        }
    }

    fn transition_failure(&self, task: &fte_core::Task, error: fte_engine::StateMachineError, start: Instant) -> ExitLogEntry {
        warn!(task_id = %task.id, error = %error, "state transition failed");
        ExitLogEntry {
            task: task.name().into_owned(),
            reason: format!("transition_error: {error}"),
            success: false,
            final_state: task.state,
            duration_secs: start.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    fn persist_checkpoint(&self, stop_hook_set: bool) -> Result<(), SchedulerError> {
        let checkpoint = SchedulerCheckpoint {
            last_iteration: *self.iteration.lock(),
            started_at: self.started_at,
            exit_log: self.exit_log.lock().clone(),
            stop_hook_set,
        };
        let path = self.layout.scheduler_checkpoint_path();
        let tmp_path = path.with_extension("json.tmp");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SchedulerError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let json = serde_json::to_string_pretty(&checkpoint)?;
        std::fs::write(&tmp_path, json).map_err(|e| SchedulerError::Io { path: tmp_path.clone(), source: e })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| SchedulerError::Io { path, source: e })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
