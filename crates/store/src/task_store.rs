// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task store (C1): read/write Markdown+frontmatter task files, and the
//! atomic move primitive used by the state machine to change a task's
//! physical location.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fte_core::{Task, WorkflowState};
use thiserror::Error;

use crate::frontmatter::{self, FrontmatterError};

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
    #[error("{path}: parent directory {parent} is not a recognized state folder")]
    UnknownStateFolder { path: PathBuf, parent: String },
}

impl TaskStoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Transient I/O is retried by the state machine; permission and
    /// disk-full are fatal and handled by dedicated policies there.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { source, .. } => {
                !self.is_permission_denied_source(source)
                    && !is_disk_full(source)
                    && source.kind() != std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    fn is_permission_denied_source(&self, source: &std::io::Error) -> bool {
        source.kind() == std::io::ErrorKind::PermissionDenied
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied)
    }

    pub fn is_disk_full(&self) -> bool {
        matches!(self, Self::Io { source, .. } if is_disk_full(source))
    }
}

/// `ENOSPC` ("No space left on device"), matched by raw OS error code the
/// way the original implementation checks `errno == 28`, since the
/// corresponding `std::io::ErrorKind` variant is not guaranteed stable
/// across all supported toolchains.
fn is_disk_full(source: &std::io::Error) -> bool {
    source.raw_os_error() == Some(28)
}

/// Read/write/move task files. Stateless; every operation takes an
/// explicit path.
#[derive(Debug, Clone, Default)]
pub struct TaskStore;

impl TaskStore {
    pub fn new() -> Self {
        Self
    }

    /// Read `path`, requiring a leading frontmatter fence, and parse it
    /// into a [`Task`]. The returned task's `file_path` is set to `path`.
    pub fn load(&self, path: &Path) -> Result<Task, TaskStoreError> {
        let raw = fs::read_to_string(path).map_err(|e| TaskStoreError::io(path, e))?;
        let (mut task, body): (Task, String) = frontmatter::parse(&raw)
            .map_err(|e| TaskStoreError::Frontmatter { path: path.to_path_buf(), source: e })?;
        task.body = body;
        task.file_path = path.to_path_buf();
        Ok(task)
    }

    /// Write `task` to `path` as frontmatter + body. Creates the parent
    /// directory if needed. Not required to be atomic (unlike `move_task`).
    pub fn save(&self, task: &Task, path: &Path) -> Result<(), TaskStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskStoreError::io(parent, e))?;
        }
        let rendered = frontmatter::render(task, &task.body)
            .map_err(|e| TaskStoreError::Frontmatter { path: path.to_path_buf(), source: e })?;
        fs::write(path, rendered).map_err(|e| TaskStoreError::io(path, e))
    }

    /// The logical state implied by `task.file_path`'s parent directory
    /// name. Folder collapse means `In_Progress` always derives to
    /// `Executing`; callers that must preserve a `Planning` distinction
    /// rely on the frontmatter `state` field instead.
    pub fn derive_state_from_location(&self, task: &Task) -> Result<WorkflowState, TaskStoreError> {
        let parent_name = task
            .file_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        WorkflowState::from_folder_name(&parent_name).ok_or_else(|| {
            TaskStoreError::UnknownStateFolder {
                path: task.file_path.clone(),
                parent: parent_name,
            }
        })
    }

    /// Sets `task.state` to the location-derived state and bumps
    /// `modified_at` if it diverged from what was already on disk.
    pub fn sync_state(&self, task: &mut Task) -> Result<(), TaskStoreError> {
        let derived = self.derive_state_from_location(task)?;
        if derived != task.state {
            task.state = derived;
            task.modified_at = Utc::now();
        }
        Ok(())
    }

    /// Atomic same-filesystem rename. Cross-device renames surface as
    /// `CrossesDevices` and must not be retried by the caller.
    pub fn move_task(&self, src: &Path, dst: &Path) -> Result<(), TaskStoreError> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskStoreError::io(parent, e))?;
        }
        fs::rename(src, dst).map_err(|e| TaskStoreError::io(src, e))
    }
}

#[cfg(test)]
#[path = "task_store_tests.rs"]
mod tests;
