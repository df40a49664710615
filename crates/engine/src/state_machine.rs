// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State machine (C6): validates workflow transitions and physically
//! moves the task file between vault folders, keeping location and
//! logical state in lockstep.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use fte_core::{Actor, StateTransition, Task, VaultLayout, WorkflowState};
use fte_store::{AuditLog, TaskStore, TaskStoreError};
use thiserror::Error;

const MOVE_MAX_ATTEMPTS: u32 = 3;
const MOVE_BASE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("invalid transition: {from} -> {to} (allowed: {allowed:?})")]
    InvalidTransition { from: WorkflowState, to: WorkflowState, allowed: Vec<WorkflowState> },
    #[error("move failed after retries: {0}")]
    Move(#[source] TaskStoreError),
}

/// Validates the legal-transition graph and drives the file move that
/// keeps a task's physical location in sync with its logical state.
pub struct StateMachine {
    store: TaskStore,
    audit: Arc<AuditLog>,
}

impl StateMachine {
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self { store: TaskStore::new(), audit }
    }

    /// Validate `task.state -> target`, move the file to the target
    /// folder, and persist the updated frontmatter. On a permission error
    /// the task is diverted to `Rejected` instead of failing outright, so
    /// a vault permission problem surfaces as a task outcome rather than
    /// an orchestrator crash.
    pub fn transition(
        &self,
        task: &mut Task,
        layout: &VaultLayout,
        target: WorkflowState,
        reason: &str,
        actor: Actor,
    ) -> Result<(), StateMachineError> {
        let from = task.state;
        if !from.can_transition_to(target) {
            return Err(StateMachineError::InvalidTransition {
                from,
                to: target,
                allowed: from.legal_targets().to_vec(),
            });
        }

        let file_name = task.file_path.file_name().map(|n| n.to_os_string());
        let Some(file_name) = file_name else {
            return Err(StateMachineError::Move(TaskStoreError::io(
                task.file_path.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "task path has no file name"),
            )));
        };
        let dest_path = layout.dir_for(target).join(&file_name);

        match self.move_with_retry(&task.file_path, &dest_path) {
            Ok(()) => {
                task.file_path = dest_path;
                task.state = target;
                task.modified_at = Utc::now();
                let _ = self.store.save(task, &task.file_path);
                self.record(task, from, target, reason, actor, None);
                Ok(())
            }
            Err(e) if e.is_permission_denied() && target != WorkflowState::Rejected => {
                let rejected_path = layout.dir_for(WorkflowState::Rejected).join(&file_name);
                if self.store.move_task(&task.file_path, &rejected_path).is_ok() {
                    task.file_path = rejected_path;
                    task.state = WorkflowState::Rejected;
                    task.modified_at = Utc::now();
                    let _ = self.store.save(task, &task.file_path);
                    self.record(
                        task,
                        from,
                        WorkflowState::Rejected,
                        reason,
                        actor,
                        Some(format!("permission denied moving to {target}: {e}")),
                    );
                    return Ok(());
                }
                self.record(task, from, target, reason, actor, Some(e.to_string()));
                Err(StateMachineError::Move(e))
            }
            Err(e) => {
                self.record(task, from, target, reason, actor, Some(e.to_string()));
                Err(StateMachineError::Move(e))
            }
        }
    }

    /// Retry transient move failures with exponential backoff; permission
    /// and disk-full errors are returned immediately without retrying.
    fn move_with_retry(&self, src: &std::path::Path, dst: &std::path::Path) -> Result<(), TaskStoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.move_task(src, dst) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_permission_denied() || e.is_disk_full() => return Err(e),
                Err(e) if attempt < MOVE_MAX_ATTEMPTS => {
                    thread::sleep(MOVE_BASE_DELAY * 2u32.pow(attempt - 1));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record(
        &self,
        task: &Task,
        from: WorkflowState,
        to: WorkflowState,
        reason: &str,
        actor: Actor,
        error: Option<String>,
    ) {
        let transition = StateTransition {
            transition_id: fte_core::TransitionId::new().to_string(),
            task_id: task.id.clone(),
            from_state: from,
            to_state: to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
            actor,
            error,
        };
        let _ = self.audit.append("state_transition", &transition);
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
