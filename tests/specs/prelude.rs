// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the black-box specs: a disposable vault directory
//! plus a handle on the orchestrator binary pointed at it.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

/// How long a spec is willing to poll for a background sweep to land.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// A disposable vault with every directory pre-created and a config file
/// tuned for fast, deterministic specs (short poll interval, dry-run).
pub struct Vault {
    dir: TempDir,
    config_path: PathBuf,
}

impl Vault {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("should create temp vault dir");
        for folder in ["Inbox", "Needs_Action", "In_Progress", "Approvals", "Done", "Rejected"] {
            std::fs::create_dir_all(dir.path().join(folder)).expect("should create vault folder");
        }

        let config_path = dir.path().join("fte-orchestrator.yaml");
        std::fs::write(
            &config_path,
            format!(
                "vault_path: {:?}\n\
                 poll_interval_secs: 1\n\
                 max_iterations: 3\n\
                 dry_run: true\n\
                 stop_hook_file: .stop\n",
                dir.path().display()
            ),
        )
        .expect("should write config");

        Self { dir, config_path }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a task markdown file with minimal YAML frontmatter directly
    /// into the physical folder backing `state`.
    pub fn seed_task(&self, folder: &str, id: &str, body: &str) -> PathBuf {
        let now = "2026-01-01T00:00:00Z";
        let contents = format!(
            "---\n\
             id: {id}\n\
             state: {state}\n\
             priority: medium\n\
             created_at: {now}\n\
             modified_at: {now}\n\
             metadata: {{}}\n\
             ---\n\
             {body}",
            state = folder_to_state(folder),
        );
        let path = self.dir.path().join(folder).join(format!("{id}.md"));
        std::fs::write(&path, contents).expect("should write task fixture");
        path
    }

    /// Drop a legacy hand-written approval file into `Approvals/` that
    /// satisfies the approval gate's "approved" / not-"pending" rule.
    pub fn approve_legacy(&self, task_id: &str) {
        let path = self.dir.path().join("Approvals").join(format!("{task_id}-approval.md"));
        std::fs::write(&path, "approved by on-call lead\n").expect("should write approval marker");
    }

    pub fn signal_stop(&self) {
        std::fs::write(self.dir.path().join(".stop"), "stop\n").expect("should write stop hook");
    }

    pub fn exists_in(&self, folder: &str, id: &str) -> bool {
        self.dir.path().join(folder).join(format!("{id}.md")).exists()
    }

    pub fn orchestrator(&self) -> Command {
        let mut cmd = Command::cargo_bin("fte-orchestrator").expect("binary should build");
        cmd.env("FTE_CONFIG", &self.config_path);
        cmd
    }
}

fn folder_to_state(folder: &str) -> &'static str {
    match folder {
        "Inbox" => "inbox",
        "Needs_Action" => "needs_action",
        "In_Progress" => "planning",
        "Approvals" => "pending_approval",
        "Done" => "done",
        "Rejected" => "rejected",
        other => panic!("unknown vault folder: {other}"),
    }
}

/// Poll `check` until it returns true or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
