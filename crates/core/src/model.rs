// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed data types shared across the orchestrator: the workflow state
//! enumeration, the vault's physical layout, the task record, and the
//! transition/audit event shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::simple_display;

/// The nine directory-derived logical states a task can occupy.
///
/// `Planning` and `Executing` may physically share the `In_Progress`
/// directory, and `Pending_Approval` shares `Approvals`; [`folder_name`]
/// performs that collapse. The logical state is still the source of truth.
///
/// [`folder_name`]: WorkflowState::folder_name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Inbox,
    NeedsAction,
    Planning,
    PendingApproval,
    Executing,
    Done,
    Rejected,
}

simple_display! {
    WorkflowState {
        Inbox => "inbox",
        NeedsAction => "needs_action",
        Planning => "planning",
        PendingApproval => "pending_approval",
        Executing => "executing",
        Done => "done",
        Rejected => "rejected",
    }
}

impl WorkflowState {
    /// The physical directory this state is persisted under, under the
    /// folder-collapse scheme: `Planning`/`Executing` both resolve to
    /// `In_Progress`, `PendingApproval` resolves to `Approvals`.
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::NeedsAction => "Needs_Action",
            Self::Planning | Self::Executing => "In_Progress",
            Self::PendingApproval => "Approvals",
            Self::Done => "Done",
            Self::Rejected => "Rejected",
        }
    }

    /// Reverse mapping: derive a logical state from a physical directory
    /// name. Folder collapse makes this ambiguous for `In_Progress`, which
    /// always resolves to `Executing` — callers that need to distinguish
    /// `Planning` from `Executing` must consult the frontmatter `state`
    /// field, since location alone cannot disambiguate a collapsed folder.
    pub fn from_folder_name(name: &str) -> Option<Self> {
        match name {
            "Inbox" => Some(Self::Inbox),
            "Needs_Action" => Some(Self::NeedsAction),
            "In_Progress" => Some(Self::Executing),
            "Approvals" => Some(Self::PendingApproval),
            "Done" => Some(Self::Done),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// True if no outbound transition is ever legal from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Legal destination states per the transition graph. `Rejected ->
    /// Inbox` is included per the resolved open question (see DESIGN.md).
    pub fn legal_targets(self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Inbox => &[NeedsAction],
            NeedsAction => &[Planning],
            Planning => &[PendingApproval, Executing, NeedsAction],
            PendingApproval => &[Executing, Rejected],
            Executing => &[Done, Rejected],
            Done => &[],
            Rejected => &[Inbox],
        }
    }

    pub fn can_transition_to(self, target: WorkflowState) -> bool {
        self.legal_targets().contains(&target)
    }
}

/// Fixed set of directories a vault must contain, plus the metadata root.
#[derive(Debug, Clone)]
pub struct VaultLayout {
    root: PathBuf,
}

impl VaultLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, state: WorkflowState) -> PathBuf {
        self.root.join(state.folder_name())
    }

    /// `<vault>/.fte` — nonces, audit files, checkpoints, rate-limit state.
    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(".fte")
    }

    pub fn stop_hook_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn nonce_ledger_path(&self) -> PathBuf {
        self.metadata_dir().join("nonces.ledger")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.metadata_dir().join("audit.jsonl")
    }

    pub fn rate_limit_state_path(&self) -> PathBuf {
        self.metadata_dir().join("rate_limits.json")
    }

    pub fn scheduler_checkpoint_path(&self) -> PathBuf {
        self.metadata_dir().join("scheduler_checkpoint.json")
    }

    /// All nine directories that must exist for a well-formed vault. Note
    /// this enumerates physical folders, not logical states — `In_Progress`
    /// and `Approvals` each back two logical states.
    pub fn all_dirs(&self) -> [PathBuf; 6] {
        [
            self.dir_for(WorkflowState::Inbox),
            self.dir_for(WorkflowState::NeedsAction),
            self.dir_for(WorkflowState::Executing),
            self.dir_for(WorkflowState::PendingApproval),
            self.dir_for(WorkflowState::Done),
            self.dir_for(WorkflowState::Rejected),
        ]
    }
}

/// Categorical priority carried in task frontmatter (distinct from the
/// computed numeric [`crate::scorer`] score).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// In-file checkpoint written by the persistence loop under the reserved
/// `persistence_loop` frontmatter key. Must not be hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCheckpoint {
    pub iteration: u32,
    pub consecutive_retries: u32,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_type: Option<String>,
    #[serde(default)]
    pub state_data: BTreeMap<String, serde_yaml::Value>,
}

impl TaskCheckpoint {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            iteration: 0,
            consecutive_retries: 0,
            started_at: now,
            last_updated: now,
            last_error: None,
            last_error_type: None,
            state_data: BTreeMap::new(),
        }
    }
}

/// A single task: a Markdown file with YAML frontmatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub state: WorkflowState,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_loop: Option<TaskCheckpoint>,
    /// Markdown body, excluding the frontmatter block.
    #[serde(skip)]
    pub body: String,
    /// Current on-disk location, populated on load.
    #[serde(skip)]
    pub file_path: PathBuf,
}

impl Task {
    pub fn name(&self) -> std::borrow::Cow<'_, str> {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(std::borrow::Cow::Borrowed(""))
    }
}

/// Who initiated a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    System,
    Human,
}

/// A logged state-change event. Must be audited before the next transition
/// on the same task is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub transition_id: String,
    pub task_id: String,
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub actor: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
