// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: vault bootstrap and the one-scheduler-per-vault
//! PID lockfile, borrowed from the daemon's own startup discipline minus
//! the WAL/snapshot/socket machinery this scheduler has no use for.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use fte_core::VaultLayout;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire scheduler lock: another scheduler may already be running on this vault")]
    LockFailed(#[source] std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Live handle on a bootstrapped vault. Dropping it releases the PID
/// lockfile.
pub struct DaemonHandle {
    pub layout: VaultLayout,
    #[allow(dead_code)]
    lock_file: File,
}

/// Create every required vault directory and the `.fte` metadata root,
/// then acquire the single-scheduler-per-vault PID lock.
///
/// Uses `OpenOptions` without truncation to acquire the lock before
/// touching the file's contents, so a failed lock attempt never wipes
/// the PID of the daemon that already holds it.
pub fn startup(vault_root: &Path) -> Result<DaemonHandle, LifecycleError> {
    let layout = VaultLayout::new(vault_root);

    for dir in layout.all_dirs() {
        std::fs::create_dir_all(&dir)?;
    }
    std::fs::create_dir_all(layout.metadata_dir())?;

    let lock_path = layout.metadata_dir().join("scheduler.pid");
    let lock_file = OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    info!(vault = %vault_root.display(), "scheduler lock acquired");
    Ok(DaemonHandle { layout, lock_file })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
